//! Grouping of UMIs by the positions they occur at.
//!
//! Every distinct UMI becomes an anchor the first time it is seen, in file order. The group of an
//! anchor holds the position of the anchor line followed by the positions of all later
//! occurrences of the same UMI. Matching is exact, a line that holds the UMI twice contributes its
//! position twice.
//!
//! # Scan window
//!
//! With [`ScanWindow::Forward`] the search for matches starts at the line after the anchor line,
//! so repeats of the UMI on the anchor line itself are not part of the group. Earlier lines never
//! hold the UMI since the anchor is its first occurrence. [`ScanWindow::Full`] also includes the
//! repeats on the anchor line.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use clap::ValueEnum;
use log::debug;

use crate::anchors::AnchorIndex;
use crate::io::UmiCounts;
use crate::metrics::Metrics;
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScanWindow {
    /// Matches start at the line after the anchor line
    #[default]
    Forward,
    /// Matches start right after the anchor on the anchor line
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Rescan the rest of the file for every new anchor, groups are written as they are found
    #[default]
    Rescan,
    /// Collect all positions in a single pass, groups are written when the pass is done
    Indexed,
}

/// Output unit: an anchor UMI, its own position and the positions it was matched at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<'a> {
    pub anchor: &'a [u8],
    pub anchor_position: &'a [u8],
    pub positions: Vec<&'a [u8]>,
}

impl<'a> Group<'a> {
    pub fn new(anchor: &'a [u8], anchor_position: &'a [u8]) -> Group<'a> {
        Group { anchor, anchor_position, positions: Vec::new() }
    }

    /// Append the output line `<umi> <position> <match> ... \n` to `buf`. Every field is
    /// followed by a single space.
    pub fn write_line(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.anchor);
        buf.push(b' ');
        buf.extend_from_slice(self.anchor_position);
        buf.push(b' ');
        for position in &self.positions {
            buf.extend_from_slice(position);
            buf.push(b' ');
        }
        buf.push(b'\n');
    }
}

/// A source of groups in anchor discovery order.
pub trait Grouping<'a>: Iterator<Item = Group<'a>> {
    /// Finish grouping and return the collected metrics.
    fn finish(self) -> Metrics;
}

/// Groups by rescanning the remainder of the file for every new anchor.
///
/// Groups are produced lazily, each `next` call advances the outer pass up to the next new
/// anchor and scans the lines after it. The number of lines read is quadratic in the number of
/// lines when most UMIs are distinct.
pub struct RescanGroups<'a, 'i> {
    counts: &'a UmiCounts,
    anchors: &'i mut AnchorIndex<'a>,
    window: ScanWindow,
    line: usize,
    token: usize,
    progress: ProgressTracker,
    metrics: Metrics,
}

impl<'a, 'i> RescanGroups<'a, 'i> {
    pub fn new(
        counts: &'a UmiCounts,
        anchors: &'i mut AnchorIndex<'a>,
        window: ScanWindow,
        progress: ProgressTracker,
    ) -> RescanGroups<'a, 'i> {
        RescanGroups {
            counts,
            anchors,
            window,
            line: 0,
            token: 0,
            progress,
            metrics: Metrics::default(),
        }
    }

    /// Collect the positions of `umi` after the current outer cursor.
    fn matches_after(&self, umi: &[u8]) -> Vec<&'a [u8]> {
        let (first_line, first_token) = match self.window {
            ScanWindow::Forward => (self.line + 1, 0),
            // the outer cursor already points past the anchor token
            ScanWindow::Full => (self.line, self.token),
        };

        let mut positions = Vec::new();
        for line in first_line..self.counts.len() {
            let record = self.counts.record(line);
            let skip = if line == first_line { first_token } else { 0 };
            let position = record.position.unwrap_or_default();
            positions.extend(
                record.umis[skip..]
                    .iter()
                    .filter(|&&other| other == umi)
                    .map(|_| position),
            );
        }
        positions
    }
}

impl<'a> Iterator for RescanGroups<'a, '_> {
    type Item = Group<'a>;

    fn next(&mut self) -> Option<Group<'a>> {
        while self.line < self.counts.len() {
            let record = self.counts.record(self.line);
            if self.token == 0 {
                self.metrics.count_record(&record);
            }

            while self.token < record.umis.len() {
                let umi = record.umis[self.token];
                self.token += 1;
                if self.anchors.insert(umi) {
                    let mut group = Group::new(umi, record.position.unwrap_or_default());
                    group.positions = self.matches_after(umi);
                    debug!(
                        "anchor {} at line {} matched {} positions",
                        String::from_utf8_lossy(umi),
                        self.line + 1,
                        group.positions.len()
                    );
                    self.metrics.count_group(&group);
                    return Some(group);
                }
            }

            self.line += 1;
            self.token = 0;
            self.progress.tick();
        }
        None
    }
}

impl<'a> Grouping<'a> for RescanGroups<'a, '_> {
    fn finish(mut self) -> Metrics {
        // drain so the anchor index is complete even if the caller stopped early
        while self.next().is_some() {}
        self.progress.log_final();
        self.metrics
    }
}

/// Groups built with a single pass over the file, mapping every UMI to its group.
///
/// The groups are identical to the ones of [`RescanGroups`] for the same window, but all of them
/// are collected before the first one is returned.
pub struct IndexedGroups<'a> {
    groups: std::vec::IntoIter<Group<'a>>,
    progress: ProgressTracker,
    metrics: Metrics,
}

impl<'a> IndexedGroups<'a> {
    pub fn new(
        counts: &'a UmiCounts,
        anchors: &mut AnchorIndex<'a>,
        window: ScanWindow,
        mut progress: ProgressTracker,
    ) -> IndexedGroups<'a> {
        let mut metrics = Metrics::default();
        let mut groups: Vec<Group<'a>> = Vec::new();
        // umi -> (group index, anchor line)
        let mut slots: AHashMap<&'a [u8], (usize, usize)> = AHashMap::new();

        for line in 0..counts.len() {
            let record = counts.record(line);
            metrics.count_record(&record);
            let position = record.position.unwrap_or_default();

            for &umi in &record.umis {
                match slots.entry(umi) {
                    Entry::Occupied(e) => {
                        let (group, anchor_line) = *e.get();
                        if line > anchor_line || window == ScanWindow::Full {
                            groups[group].positions.push(position);
                        }
                    }
                    Entry::Vacant(e) => {
                        anchors.insert(umi);
                        e.insert((groups.len(), line));
                        groups.push(Group::new(umi, position));
                    }
                }
            }
            progress.tick();
        }

        for group in &groups {
            metrics.count_group(group);
        }

        IndexedGroups { groups: groups.into_iter(), progress, metrics }
    }
}

impl<'a> Iterator for IndexedGroups<'a> {
    type Item = Group<'a>;

    fn next(&mut self) -> Option<Group<'a>> {
        self.groups.next()
    }
}

impl<'a> Grouping<'a> for IndexedGroups<'a> {
    fn finish(self) -> Metrics {
        self.progress.log_final();
        self.metrics
    }
}
