use serde::Serialize;

use crate::error::MafError;

pub const COMMENT_MARKER: char = '#';
pub const VALUE_SEPARATOR: &str = ";";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(COMMENT_MARKER)?;
    let (key, value) = rest.split_once(' ')?;
    if key.is_empty() || value.trim().is_empty() {
        return None;
    }
    Some((key, value))
}

pub fn split_header(
    lines: Vec<String>,
    source: &str,
) -> Result<(Vec<String>, HeaderMap), MafError> {
    let mut header = HeaderMap::new();
    let mut body = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        if !line.starts_with(COMMENT_MARKER) {
            body.push(line);
            continue;
        }
        let (key, value) =
            parse_header_line(&line).ok_or_else(|| MafError::MalformedHeader {
                file: source.to_string(),
                line: index + 1,
                content: line.clone(),
            })?;
        header.insert(key, value);
    }
    Ok((body, header))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedHeader {
    entries: Vec<(String, Vec<String>)>,
}

impl MergedHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, header: &HeaderMap) {
        for (key, value) in header.iter() {
            self.add_value(key, value);
        }
    }

    pub fn merge(&mut self, other: &MergedHeader) {
        for (key, values) in &other.entries {
            for value in values {
                self.add_value(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn joined(&self, key: &str) -> Option<String> {
        self.get(key).map(|values| values.join(VALUE_SEPARATOR))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(key, values)| {
            format!("{COMMENT_MARKER}{key} {}", values.join(VALUE_SEPARATOR))
        })
    }

    fn add_value(&mut self, key: &str, value: &str) {
        let position = match self.entries.iter().position(|(existing, _)| existing == key) {
            Some(position) => position,
            None => {
                self.entries.push((key.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let values = &mut self.entries[position].1;
        if !values.iter().any(|existing| existing == value) {
            values.push(value.to_string());
        }
    }
}

pub fn merge_headers(headers: &[HeaderMap]) -> MergedHeader {
    let mut merged = MergedHeader::new();
    for header in headers {
        merged.absorb(header);
    }
    merged
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn header(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (key, value) in pairs {
            map.insert(*key, *value);
        }
        map
    }

    #[test]
    fn split_keeps_body_order() {
        let (body, header) = split_header(
            lines("#version gdc-1.0.0\n#filedate 20190101\nHugo_Symbol\tGene\nTP53\tENSG1\n"),
            "a.maf",
        )
        .unwrap();
        assert_eq!(body, vec!["Hugo_Symbol\tGene", "TP53\tENSG1"]);
        assert_eq!(header.get("version"), Some("gdc-1.0.0"));
        assert_eq!(header.get("filedate"), Some("20190101"));
        assert_eq!(header.len(), 2);
    }

    #[test]
    fn value_keeps_inner_spaces() {
        assert_eq!(
            parse_header_line("#annotation.spec gdc 1.0 public"),
            Some(("annotation.spec", "gdc 1.0 public"))
        );
    }

    #[test]
    fn header_without_value_is_malformed() {
        let err = split_header(lines("#ok yes\nA\n#lonely\n"), "b.maf").unwrap_err();
        assert_matches!(err, MafError::MalformedHeader { line: 3, .. });
        assert_eq!(parse_header_line("# leading"), None);
        assert_eq!(parse_header_line("#key "), None);
    }

    #[test]
    fn repeated_key_in_one_file_keeps_last() {
        let (_, header) = split_header(lines("#a 1\n#b 2\n#a 3\n"), "c.maf").unwrap();
        assert_eq!(header.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn merge_dedupes_in_first_seen_order() {
        let merged = merge_headers(&[
            header(&[("source", "A"), ("version", "1")]),
            header(&[("source", "B"), ("extra", "x")]),
            header(&[("source", "A")]),
        ]);
        assert_eq!(merged.joined("source").as_deref(), Some("A;B"));
        assert_eq!(merged.joined("version").as_deref(), Some("1"));
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["source", "version", "extra"]);
        assert_eq!(
            merged.lines().collect::<Vec<_>>(),
            vec!["#source A;B", "#version 1", "#extra x"]
        );
    }

    #[test]
    fn merging_with_itself_is_idempotent() {
        let merged = merge_headers(&[
            header(&[("source", "A"), ("version", "1")]),
            header(&[("source", "B")]),
        ]);
        let mut again = merged.clone();
        again.merge(&merged);
        assert_eq!(again, merged);
    }
}
