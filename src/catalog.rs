// src/catalog.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// One row of the flattened section/question/option join, ordered by
/// section, question, option. Option columns are nullable (LEFT JOIN):
/// a question with no options still produces one row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CatalogRow {
    pub section_id: i64,
    pub section_name: String,
    pub question_id: i64,
    pub question_text: String,
    pub option_id: Option<i64>,
    pub option_text: Option<String>,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub option_id: i64,
    pub option_text: String,
    pub rating: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuestion {
    pub question_id: i64,
    pub question_text: String,
    /// Always present in the output, possibly empty, never null.
    pub options: Vec<CatalogOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub section_id: i64,
    pub section_name: String,
    pub questions: Vec<CatalogQuestion>,
}

/// Folds the flat row-set into the nested document served to candidates.
///
/// Single linear pass. Grouping is keyed by section then question in
/// first-seen order, so the output ordering is exactly the input ordering
/// and the function is idempotent over the same row-set.
pub fn assemble(rows: &[CatalogRow]) -> Vec<CatalogSection> {
    let mut sections: Vec<CatalogSection> = Vec::new();
    let mut section_index: HashMap<i64, usize> = HashMap::new();
    let mut question_index: HashMap<(i64, i64), usize> = HashMap::new();

    for row in rows {
        let si = *section_index.entry(row.section_id).or_insert_with(|| {
            sections.push(CatalogSection {
                section_id: row.section_id,
                section_name: row.section_name.clone(),
                questions: Vec::new(),
            });
            sections.len() - 1
        });

        let qi = *question_index
            .entry((row.section_id, row.question_id))
            .or_insert_with(|| {
                sections[si].questions.push(CatalogQuestion {
                    question_id: row.question_id,
                    question_text: row.question_text.clone(),
                    options: Vec::new(),
                });
                sections[si].questions.len() - 1
            });

        if let Some(option_id) = row.option_id {
            sections[si].questions[qi].options.push(CatalogOption {
                option_id,
                option_text: row.option_text.clone().unwrap_or_default(),
                rating: row.rating.unwrap_or(0),
            });
        }
    }

    sections
}
