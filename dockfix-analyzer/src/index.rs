use crate::error::AnalyzerError;
use dockfix_types::defect::Defect;
use std::collections::{BTreeMap, BTreeSet};

/// Defects grouped by line, in analyzer order within each line.
///
/// An index is tied to the document version it was computed against and is
/// never patched; re-analysis replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefectIndex {
    by_line: BTreeMap<usize, Vec<Defect>>,
    version: u64,
}

impl DefectIndex {
    /// Groups `defects`, dropping `ignored` codes.
    ///
    /// Fatal codes are checked first and cannot be ignored.
    pub fn build(
        defects: Vec<Defect>,
        ignored: &BTreeSet<String>,
        version: u64,
    ) -> Result<Self, AnalyzerError> {
        if let Some(fatal) = defects.iter().find(|d| d.is_fatal()) {
            return Err(AnalyzerError::Rejected {
                code: fatal.code.clone(),
                line: fatal.line,
                message: fatal.message.clone(),
            });
        }

        let mut by_line: BTreeMap<usize, Vec<Defect>> = BTreeMap::new();
        for defect in defects {
            if ignored.contains(&defect.code) {
                continue;
            }
            by_line.entry(defect.line).or_default().push(defect);
        }
        Ok(Self { by_line, version })
    }

    /// Document version the positions refer to.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_line.keys().copied()
    }

    pub fn at(&self, line: usize) -> &[Defect] {
        self.by_line.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Defect> {
        self.by_line.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_line.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(line: usize, code: &str) -> Defect {
        Defect::new(line, code, "")
    }

    #[test]
    fn groups_by_line_preserving_detection_order() {
        let idx = DefectIndex::build(
            vec![d(4, "DL3020"), d(2, "DL3008"), d(2, "DL3015"), d(2, "DL3009")],
            &BTreeSet::new(),
            7,
        )
        .unwrap();
        assert_eq!(idx.lines().collect::<Vec<_>>(), vec![2, 4]);
        let codes: Vec<_> = idx.at(2).iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["DL3008", "DL3015", "DL3009"]);
        assert_eq!(idx.len(), 4);
        assert_eq!(idx.version(), 7);
        assert!(idx.at(3).is_empty());
    }

    #[test]
    fn ignored_codes_are_dropped_and_empty_lines_vanish() {
        let ignored: BTreeSet<String> = ["DL4006".to_string()].into();
        let idx = DefectIndex::build(vec![d(3, "DL4006"), d(5, "DL3020")], &ignored, 0).unwrap();
        assert_eq!(idx.lines().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn fatal_code_aborts_even_if_ignored() {
        let ignored: BTreeSet<String> = ["DL1000".to_string()].into();
        let err = DefectIndex::build(vec![d(1, "DL3020"), d(9, "DL1000")], &ignored, 0).unwrap_err();
        match err {
            AnalyzerError::Rejected { code, line, .. } => {
                assert_eq!(code, "DL1000");
                assert_eq!(line, 9);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
