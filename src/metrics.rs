use std::fmt;

use crate::record::Record;
use crate::scan::Group;

/// Grouping metrics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    lines_examined: usize,
    lines_without_umis: usize,
    umis_examined: usize,
    oversized_umis: usize,
    anchors: usize,
    matched_positions: usize,
    anchors_with_matches: usize,
}

pub enum Status {
    Line,
    LineWithoutUmis,
    Umi,
    OversizedUmi,
    Anchor,
    MatchedPosition,
    AnchorWithMatches,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LINES_EXAMINED\tLINES_WITHOUT_UMIS\tUMIS_EXAMINED\tOVERSIZED_UMIS\tANCHORS\tMATCHED_POSITIONS\tANCHORS_WITH_MATCHES\tFRACTION_RECURRING")?;
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            self.lines_examined,
            self.lines_without_umis,
            self.umis_examined,
            self.oversized_umis,
            self.anchors,
            self.matched_positions,
            self.anchors_with_matches,
            self.fraction_recurring()
        )
    }
}

impl Metrics {
    /// Fraction of anchors that were found at more than one position.
    pub fn fraction_recurring(&self) -> f64 {
        if self.anchors == 0 {
            0.0
        } else {
            self.anchors_with_matches as f64 / self.anchors as f64
        }
    }

    pub fn anchors(&self) -> usize {
        self.anchors
    }

    pub fn lines_examined(&self) -> usize {
        self.lines_examined
    }

    pub fn matched_positions(&self) -> usize {
        self.matched_positions
    }

    pub fn count(&mut self, status: Status) {
        self.count_many(status, 1);
    }

    pub fn count_many(&mut self, status: Status, count: usize) {
        match status {
            Status::Line => self.lines_examined += count,
            Status::LineWithoutUmis => self.lines_without_umis += count,
            Status::Umi => self.umis_examined += count,
            Status::OversizedUmi => self.oversized_umis += count,
            Status::Anchor => self.anchors += count,
            Status::MatchedPosition => self.matched_positions += count,
            Status::AnchorWithMatches => self.anchors_with_matches += count,
        }
    }

    /// Count a line of the outer pass.
    pub fn count_record(&mut self, record: &Record<'_>) {
        self.count(Status::Line);
        if !record.has_umis() {
            self.count(Status::LineWithoutUmis);
        }
        self.count_many(Status::Umi, record.umis.len());
        self.count_many(Status::OversizedUmi, record.oversized);
    }

    pub fn count_group(&mut self, group: &Group<'_>) {
        self.count(Status::Anchor);
        self.count_many(Status::MatchedPosition, group.positions.len());
        if !group.positions.is_empty() {
            self.count(Status::AnchorWithMatches);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let mut m = Metrics::default();
        m.count_record(&Record::parse(b"chr1:1 2 AC GT"));
        m.count_record(&Record::parse(b"chr1:2 2"));
        m.count_record(&Record::parse_bounded(b"chr1:3 2 ACGTA", Some(4)));

        let mut g = Group::new(b"AC", b"chr1:1");
        m.count_group(&g);
        g.positions.push(b"chr1:9");
        g.positions.push(b"chr1:9");
        m.count_group(&g);

        assert_eq!(m.lines_examined(), 3);
        assert_eq!(m.lines_without_umis, 2);
        assert_eq!(m.umis_examined, 2);
        assert_eq!(m.oversized_umis, 1);
        assert_eq!(m.anchors(), 2);
        assert_eq!(m.matched_positions(), 2);
        assert_eq!(m.anchors_with_matches, 1);
        assert!((m.fraction_recurring() - 0.5).abs() < f64::EPSILON);

        let text = m.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tFRACTION_RECURRING"));
        assert_eq!(lines[1], "3\t2\t2\t1\t2\t2\t1\t0.5000");
    }

    #[test]
    fn empty() {
        let m = Metrics::default();
        assert_eq!(m.fraction_recurring(), 0.0);
    }
}
