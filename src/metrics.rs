use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::table::{ColumnSchema, MafTable, Record};

const MUTATION_KEY_SEPARATOR: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsColumns {
    pub gene: String,
    pub case: String,
    pub start: String,
    pub end: String,
    pub chromosome: String,
}

impl Default for MetricsColumns {
    fn default() -> Self {
        Self {
            gene: "Gene".to_string(),
            case: "case_id".to_string(),
            start: "Start_Position".to_string(),
            end: "End_Position".to_string(),
            chromosome: "Chromosome".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSummary {
    pub files: usize,
    pub records: usize,
    pub genes: usize,
    pub cases: usize,
    pub mutations: usize,
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    gene: Option<usize>,
    case: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
    chromosome: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    columns: MetricsColumns,
    files: usize,
    records: usize,
    genes: HashSet<String>,
    cases: HashSet<String>,
    mutations: HashSet<String>,
}

impl MetricsAccumulator {
    pub fn new(columns: MetricsColumns) -> Self {
        Self {
            columns,
            files: 0,
            records: 0,
            genes: HashSet::new(),
            cases: HashSet::new(),
            mutations: HashSet::new(),
        }
    }

    pub fn observe_file(&mut self, schema: &ColumnSchema, records: &[Record]) {
        let indices = self.resolve(schema);
        self.files += 1;
        for record in records {
            self.observe(indices, record);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            files: self.files,
            records: self.records,
            genes: self.genes.len(),
            cases: self.cases.len(),
            mutations: self.mutations.len(),
        }
    }

    fn observe(&mut self, indices: ColumnIndices, record: &Record) {
        self.records += 1;
        let value = |index: Option<usize>| {
            index
                .and_then(|index| record.value(index))
                .filter(|value| !value.is_empty())
        };

        let gene = value(indices.gene);
        if let Some(gene) = gene {
            self.genes.insert(gene.to_string());
        }
        if let Some(case) = value(indices.case) {
            self.cases.insert(case.to_string());
        }
        if let (Some(gene), Some(start), Some(end), Some(chromosome)) = (
            gene,
            value(indices.start),
            value(indices.end),
            value(indices.chromosome),
        ) {
            self.mutations
                .insert([gene, start, end, chromosome].join(MUTATION_KEY_SEPARATOR));
        }
    }

    fn resolve(&self, schema: &ColumnSchema) -> ColumnIndices {
        let lookup = |column: &str| {
            let index = schema.index_of(column);
            if index.is_none() {
                tracing::warn!(column, "metrics column missing from schema");
            }
            index
        };
        ColumnIndices {
            gene: lookup(&self.columns.gene),
            case: lookup(&self.columns.case),
            start: lookup(&self.columns.start),
            end: lookup(&self.columns.end),
            chromosome: lookup(&self.columns.chromosome),
        }
    }
}

pub fn compute(table: &MafTable, columns: &MetricsColumns) -> MetricsSummary {
    let mut accumulator = MetricsAccumulator::new(columns.clone());
    if let Some(schema) = table.schema() {
        accumulator.observe_file(schema, table.records());
    }
    accumulator.summary()
}
