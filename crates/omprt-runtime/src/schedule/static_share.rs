//! Block-cyclic static partition
//!
//! Rank `r` of a team of `n` takes blocks `r, r + n, r + 2n, ...` of
//! `chunk` consecutive elements. Chunk 1 is plain round-robin. The
//! partition depends only on rank, team size and chunk, so it is the same
//! on every run.

use core::iter::Fuse;

pub struct StaticShare<I: Iterator> {
    iter: Fuse<I>,
    chunk: usize,
    /// Elements owned by other ranks between two of our blocks
    stride: usize,
    /// Elements to skip before our next block
    skip: usize,
    /// Elements left in the current block
    left: usize,
}

impl<I: Iterator> StaticShare<I> {
    pub fn new(iter: I, rank: usize, team_size: usize, chunk: usize) -> Self {
        let chunk = chunk.max(1);
        Self {
            iter: iter.fuse(),
            chunk,
            stride: team_size.saturating_sub(1).saturating_mul(chunk),
            skip: rank.saturating_mul(chunk),
            left: 0,
        }
    }
}

impl<I: Iterator> Iterator for StaticShare<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.left == 0 {
            if self.skip > 0 {
                self.iter.nth(self.skip - 1)?;
            }
            self.skip = self.stride;
            self.left = self.chunk;
        }
        let item = self.iter.next()?;
        self.left -= 1;
        Some(item)
    }
}
