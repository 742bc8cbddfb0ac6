//! Packed-tuple column kernel for multi-round stitch sorting.
//!
//! A [`StitchedColumn`] materializes the key columns selected for one
//! round into a single contiguous buffer of `(rowID, key_1, .., key_W)`
//! tuples. Interleaving the row id with the keys means a sort swap moves
//! payload and keys together, and the cache lines the comparator touches
//! already hold the payload. The width `W` is fixed at stitch time and
//! every operation afterwards runs monomorphized for its tuple size.

use std::cmp::Ordering;
use std::fmt;

use anyhow::{bail, Result};

/// An immutable array of `u32` key values, indexed by row id. All columns
/// participating in one run share the same length.
pub type RawColumn = Vec<u32>;

/// Largest number of key columns that can be stitched into one tuple.
pub const MAX_COMPARE_FACTOR: usize = 4;

/// A contiguous run of positions whose rows are equal on every key sorted
/// so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortingGroup {
    pub start: usize,
    pub length: usize,
}

/// Row permutation plus its equality partition, threaded by move from one
/// round to the next. `groups` lists disjoint [`SortingGroup`]s covering
/// `0..indices.len()` in ascending `start` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortingState {
    pub groups: Vec<SortingGroup>,
    pub indices: Vec<u32>,
}

impl SortingState {
    /// Seed state for the first round: identity permutation and a single
    /// group spanning every position.
    pub fn identity(num_rows: usize) -> Self {
        let groups = if num_rows == 0 {
            Vec::new()
        } else {
            vec![SortingGroup { start: 0, length: num_rows }]
        };
        Self {
            groups,
            indices: (0..num_rows as u32).collect(),
        }
    }
}

/// Tuple storage specialized per compare factor. Each variant owns one
/// contiguous allocation of `(W + 1)`-word tuples, so the whole column is
/// `N * (W + 1) * 4` bytes with no padding.
enum TupleBuf {
    W1(Vec<[u32; 2]>),
    W2(Vec<[u32; 3]>),
    W3(Vec<[u32; 4]>),
    W4(Vec<[u32; 5]>),
}

/// One round's worth of packed `(rowID, key..)` tuples.
pub struct StitchedColumn {
    tuples: TupleBuf,
}

impl StitchedColumn {
    /// Gather the selected key columns into packed tuples, visiting the
    /// raw columns in the order dictated by `indices`. Fails only when the
    /// compare factor `cols.len()` is outside `1..=MAX_COMPARE_FACTOR`.
    pub fn stitch(cols: &[&RawColumn], indices: &[u32]) -> Result<Self> {
        let tuples = match cols.len() {
            1 => TupleBuf::W1(stitch_tuples(cols, indices)),
            2 => TupleBuf::W2(stitch_tuples(cols, indices)),
            3 => TupleBuf::W3(stitch_tuples(cols, indices)),
            4 => TupleBuf::W4(stitch_tuples(cols, indices)),
            w => bail!("unsupported compare factor {w}, expected 1..={MAX_COMPARE_FACTOR}"),
        };
        Ok(Self { tuples })
    }

    /// Number of tuples (rows) in the column.
    pub fn num_values(&self) -> usize {
        match &self.tuples {
            TupleBuf::W1(t) => t.len(),
            TupleBuf::W2(t) => t.len(),
            TupleBuf::W3(t) => t.len(),
            TupleBuf::W4(t) => t.len(),
        }
    }

    /// Number of key words per tuple.
    pub fn compare_factor(&self) -> usize {
        match &self.tuples {
            TupleBuf::W1(_) => 1,
            TupleBuf::W2(_) => 2,
            TupleBuf::W3(_) => 3,
            TupleBuf::W4(_) => 4,
        }
    }

    /// Sort the whole column by key. Row ids travel with their tuple; the
    /// relative order of equal keys is unspecified.
    pub fn sort(&mut self) {
        match &mut self.tuples {
            TupleBuf::W1(t) => sort_tuples(t),
            TupleBuf::W2(t) => sort_tuples(t),
            TupleBuf::W3(t) => sort_tuples(t),
            TupleBuf::W4(t) => sort_tuples(t),
        }
    }

    /// Sort each group of the incoming partition independently, never
    /// moving a tuple across a group boundary. Length-1 groups are
    /// skipped.
    pub fn sort_groups(&mut self, groups: &[SortingGroup]) {
        match &mut self.tuples {
            TupleBuf::W1(t) => sort_tuple_groups(t, groups),
            TupleBuf::W2(t) => sort_tuple_groups(t, groups),
            TupleBuf::W3(t) => sort_tuple_groups(t, groups),
            TupleBuf::W4(t) => sort_tuple_groups(t, groups),
        }
    }

    /// Single scan over the sorted tuples: copy out the row ids and emit a
    /// group boundary at every key change. The last group always closes at
    /// the end of the column.
    pub fn group_and_index(&self) -> SortingState {
        match &self.tuples {
            TupleBuf::W1(t) => scan_groups(t),
            TupleBuf::W2(t) => scan_groups(t),
            TupleBuf::W3(t) => scan_groups(t),
            TupleBuf::W4(t) => scan_groups(t),
        }
    }

    /// Like [`group_and_index`](Self::group_and_index), but confined to
    /// the incoming partition: a sub-group never spans a boundary of
    /// `prev_groups`, and every incoming group is closed at its own end.
    /// The result is a refinement of `prev_groups`.
    pub fn group_and_index_within(&self, prev_groups: &[SortingGroup]) -> SortingState {
        match &self.tuples {
            TupleBuf::W1(t) => refine_groups(t, prev_groups),
            TupleBuf::W2(t) => refine_groups(t, prev_groups),
            TupleBuf::W3(t) => refine_groups(t, prev_groups),
            TupleBuf::W4(t) => refine_groups(t, prev_groups),
        }
    }

    /// Copy out the row ids in tuple order, without group detection. Used
    /// after the final round to produce the finished permutation.
    pub fn index_only(&self) -> Vec<u32> {
        match &self.tuples {
            TupleBuf::W1(t) => t.iter().map(|t| t[0]).collect(),
            TupleBuf::W2(t) => t.iter().map(|t| t[0]).collect(),
            TupleBuf::W3(t) => t.iter().map(|t| t[0]).collect(),
            TupleBuf::W4(t) => t.iter().map(|t| t[0]).collect(),
        }
    }
}

impl fmt::Debug for StitchedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tuples {
            TupleBuf::W1(t) => fmt_tuples(t, f),
            TupleBuf::W2(t) => fmt_tuples(t, f),
            TupleBuf::W3(t) => fmt_tuples(t, f),
            TupleBuf::W4(t) => fmt_tuples(t, f),
        }
    }
}

fn fmt_tuples<const T: usize>(tuples: &[[u32; T]], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut list = f.debug_list();
    for tuple in tuples {
        list.entry(&(tuple[0], &tuple[1..]));
    }
    list.finish()
}

/// Key order: slots `1..` compared as unsigned words, slot 0 (the row id)
/// is payload.
#[inline]
fn key_cmp<const T: usize>(a: &[u32; T], b: &[u32; T]) -> Ordering {
    a[1..].cmp(&b[1..])
}

fn stitch_tuples<const T: usize>(cols: &[&RawColumn], indices: &[u32]) -> Vec<[u32; T]> {
    let mut tuples = Vec::with_capacity(indices.len());
    for &row in indices {
        let mut tuple = [0u32; T];
        tuple[0] = row;
        for (slot, col) in tuple[1..].iter_mut().zip(cols) {
            *slot = col[row as usize];
        }
        tuples.push(tuple);
    }
    tuples
}

fn sort_tuples<const T: usize>(tuples: &mut [[u32; T]]) {
    tuples.sort_unstable_by(key_cmp);
}

fn sort_tuple_groups<const T: usize>(tuples: &mut [[u32; T]], groups: &[SortingGroup]) {
    for group in groups {
        if group.length < 2 {
            continue;
        }
        tuples[group.start..group.start + group.length].sort_unstable_by(key_cmp);
    }
}

fn scan_groups<const T: usize>(tuples: &[[u32; T]]) -> SortingState {
    let num_values = tuples.len();
    let mut indices = Vec::with_capacity(num_values);
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 0..num_values {
        indices.push(tuples[i][0]);
        if i + 1 == num_values || tuples[i][1..] != tuples[i + 1][1..] {
            groups.push(SortingGroup { start, length: i + 1 - start });
            start = i + 1;
        }
    }
    SortingState { groups, indices }
}

fn refine_groups<const T: usize>(tuples: &[[u32; T]], prev_groups: &[SortingGroup]) -> SortingState {
    let mut indices = Vec::with_capacity(tuples.len());
    let mut groups = Vec::new();
    for prev in prev_groups {
        let end = prev.start + prev.length;
        let mut start = prev.start;
        for i in prev.start..end {
            indices.push(tuples[i][0]);
            if i + 1 == end || tuples[i][1..] != tuples[i + 1][1..] {
                groups.push(SortingGroup { start, length: i + 1 - start });
                start = i + 1;
            }
        }
    }
    SortingState { groups, indices }
}
