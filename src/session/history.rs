use crate::sanitize::{sanitize_lines, Rule};

/// One executed cell, keyed by the host-assigned identifier.
///
/// Created on the first execution of an identifier, overwritten in place on
/// every re-execution, never removed for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct CellRecord {
    pub id: String,
    pub raw_source: String,
    pub sanitized_source: String,
    pub line_count: usize,
}

/// Ordered history of executed cells, insertion order = order of first
/// execution. Re-executing an identifier replaces its record at the original
/// position, so the synthetic document reads as the notebook is currently
/// written, not in replay order.
#[derive(Debug, Default)]
pub struct SessionHistory {
    records: Vec<CellRecord>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    /// Record one execution request. Appends for an unseen identifier,
    /// replaces in place for a seen one. Infallible: when no rule applies,
    /// the sanitized source is the raw source line-for-line.
    pub fn record_execution(&mut self, id: &str, raw_source: &str, rules: &[Rule]) -> &CellRecord {
        let lines = sanitize_lines(raw_source, rules);
        let record = CellRecord {
            id: id.to_string(),
            raw_source: raw_source.to_string(),
            line_count: lines.len(),
            sanitized_source: lines.join("\n"),
        };

        match self.records.iter().position(|r| r.id == id) {
            Some(pos) => {
                self.records[pos] = record;
                &self.records[pos]
            }
            None => {
                self.records.push(record);
                self.records.last().expect("just pushed")
            }
        }
    }

    /// The accumulated program handed to the checker, plus the offset table
    /// used to map checker line numbers back to cells. Pure function of the
    /// current history.
    pub fn synthetic_document(&self) -> (String, CellOffsets) {
        let mut document = String::new();
        let mut entries = Vec::with_capacity(self.records.len());
        let mut offset = 0usize;

        for record in &self.records {
            entries.push(OffsetEntry {
                id: record.id.clone(),
                offset,
                line_count: record.line_count,
            });
            document.push_str(&record.sanitized_source);
            document.push('\n');
            offset += record.line_count;
        }

        (document, CellOffsets { entries })
    }
}

/// Starting offsets of each cell in the synthetic document, in sequence
/// order. An offset is the number of document lines before the cell, so a
/// cell with offset `o` and `n` lines covers 1-based absolute lines
/// `o + 1 ..= o + n`.
#[derive(Debug, Clone)]
pub struct CellOffsets {
    entries: Vec<OffsetEntry>,
}

#[derive(Debug, Clone)]
pub struct OffsetEntry {
    pub id: String,
    pub offset: usize,
    pub line_count: usize,
}

/// Where an absolute line landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<'a> {
    pub id: &'a str,
    pub relative_line: usize,
    pub offset: usize,
    /// The absolute line was past the end of the document and was clamped to
    /// the last line of the nearest preceding cell.
    pub clamped: bool,
}

impl CellOffsets {
    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    pub fn total_lines(&self) -> usize {
        self.entries
            .last()
            .map(|e| e.offset + e.line_count)
            .unwrap_or(0)
    }

    /// Find the cell containing a 1-based absolute line. Line 0 (and any
    /// line when the history is empty) belongs to no cell; lines past the
    /// document end clamp to the last cell's last line.
    pub fn locate(&self, absolute_line: usize) -> Option<Located<'_>> {
        if absolute_line == 0 || self.entries.is_empty() {
            return None;
        }

        let total = self.total_lines();
        if absolute_line > total {
            let last = self.entries.last().expect("non-empty");
            return Some(Located {
                id: &last.id,
                relative_line: last.line_count,
                offset: last.offset,
                clamped: true,
            });
        }

        // Offsets are sorted and contiguous by construction.
        let idx = self
            .entries
            .partition_point(|e| e.offset < absolute_line)
            .saturating_sub(1);
        let entry = &self.entries[idx];

        Some(Located {
            id: &entry.id,
            relative_line: absolute_line - entry.offset,
            offset: entry.offset,
            clamped: false,
        })
    }
}
