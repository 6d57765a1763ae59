use serde::Serialize;

use crate::error::MafError;

pub const FIELD_SEPARATOR: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema(Vec<String>);

impl ColumnSchema {
    pub fn parse(line: &str) -> Self {
        Self(line.split(FIELD_SEPARATOR).map(str::to_string).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.0.iter().position(|name| name == column)
    }

    pub fn to_line(&self) -> String {
        self.0.join("\t")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn get<'a>(&'a self, schema: &ColumnSchema, column: &str) -> Option<&'a str> {
        schema.index_of(column).and_then(|index| self.value(index))
    }

    pub fn fields<'a>(&'a self, schema: &'a ColumnSchema) -> impl Iterator<Item = (&'a str, &'a str)> {
        schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn to_line(&self) -> String {
        self.values.join("\t")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTable {
    pub schema: ColumnSchema,
    pub records: Vec<Record>,
}

pub fn normalize_body(body: &[String], source: &str) -> Result<Option<FileTable>, MafError> {
    let mut rows = body
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_empty());
    let Some((_, schema_line)) = rows.next() else {
        return Ok(None);
    };
    let schema = ColumnSchema::parse(schema_line);

    let mut records = Vec::new();
    for (index, line) in rows {
        let values = line
            .split(FIELD_SEPARATOR)
            .map(str::to_string)
            .collect::<Vec<_>>();
        if values.len() != schema.len() {
            return Err(MafError::SchemaMismatch {
                file: source.to_string(),
                detail: format!(
                    "body row {} has {} fields, schema has {}",
                    index + 1,
                    values.len(),
                    schema.len()
                ),
            });
        }
        records.push(Record::new(values));
    }
    Ok(Some(FileTable { schema, records }))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MafTable {
    schema: Option<ColumnSchema>,
    records: Vec<Record>,
}

impl MafTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, source: &str, table: FileTable) -> Result<(), MafError> {
        match &self.schema {
            None => self.schema = Some(table.schema),
            Some(schema) if *schema == table.schema => {}
            Some(schema) => {
                return Err(MafError::SchemaMismatch {
                    file: source.to_string(),
                    detail: describe_difference(schema, &table.schema),
                });
            }
        }
        self.records.extend(table.records);
        Ok(())
    }

    pub fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn describe_difference(expected: &ColumnSchema, found: &ColumnSchema) -> String {
    if expected.len() != found.len() {
        return format!(
            "{} columns, batch schema has {}",
            found.len(),
            expected.len()
        );
    }
    expected
        .columns()
        .iter()
        .zip(found.columns())
        .enumerate()
        .find(|(_, (left, right))| left != right)
        .map(|(index, (left, right))| {
            format!("column {} is {right:?}, batch schema has {left:?}", index + 1)
        })
        .unwrap_or_else(|| "columns differ".to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn body(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn first_line_is_schema() {
        let table = normalize_body(&body("Gene\tcase_id\tNote\nG1\tC1\t\nG2\tC2\tx\n"), "a")
            .unwrap()
            .unwrap();
        assert_eq!(table.schema.columns(), ["Gene", "case_id", "Note"]);
        assert_eq!(table.records.len(), 2);
        let first = &table.records[0];
        assert_eq!(first.get(&table.schema, "case_id"), Some("C1"));
        assert_eq!(first.get(&table.schema, "Note"), Some(""));
        assert_eq!(first.get(&table.schema, "Missing"), None);
        assert_eq!(
            first.fields(&table.schema).collect::<Vec<_>>(),
            vec![("Gene", "G1"), ("case_id", "C1"), ("Note", "")]
        );
    }

    #[test]
    fn empty_body_has_no_table() {
        assert_eq!(normalize_body(&[], "a").unwrap(), None);
        assert_eq!(normalize_body(&body("\n\n"), "a").unwrap(), None);
    }

    #[test]
    fn row_of_empty_fields_is_kept() {
        let table = normalize_body(&body("A\tB\tC\n1\t2\t3\n\t\t\n4\t5\t6\n"), "a")
            .unwrap()
            .unwrap();
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.records[1].values(), ["", "", ""]);
    }

    #[test]
    fn short_row_is_rejected() {
        let err = normalize_body(&body("A\tB\tC\n1\t2\n"), "short.maf").unwrap_err();
        assert_matches!(err, MafError::SchemaMismatch { file, .. } if file == "short.maf");
    }

    #[test]
    fn differing_schema_is_rejected() {
        let mut table = MafTable::new();
        let first = normalize_body(&body("A\tB\n1\t2\n"), "one").unwrap().unwrap();
        let second = normalize_body(&body("A\tC\n3\t4\n"), "two").unwrap().unwrap();
        let same = normalize_body(&body("A\tB\n5\t6\n"), "three").unwrap().unwrap();
        table.append("one", first).unwrap();
        let err = table.append("two", second).unwrap_err();
        assert_matches!(err, MafError::SchemaMismatch { file, .. } if file == "two");
        table.append("three", same).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].values(), ["5", "6"]);
    }
}
