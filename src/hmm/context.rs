use super::data::{Float, Tag};

/// Work space of the online Viterbi decoder.
///
/// Two parity slots alternate between the previous and the current word.
#[derive(Debug, Default)]
pub(crate) struct ViterbiContext {
    /**
     * The total number of distinct tags (N).
     */
    pub num_tags: usize,

    /**
     * Viterbi scores.
     *  Two [N][N] matrices whose element [j][i] holds the best score of a
     *  path whose last two tags are #j and #i.
     */
    alpha: [Vec<Float>; 2],

    /**
     * Best paths.
     *  Two [N][N] matrices whose element [j][i] holds the tags of the best
     *  path since the last anchor ending in #j, #i.
     */
    best: [Vec<Vec<Tag>>; 2],

    /* cells written since the last reset, per slot */
    touched: [Vec<usize>; 2],
}

impl ViterbiContext {
    pub fn new(num_tags: usize) -> Self {
        let cells = num_tags * num_tags;
        Self {
            num_tags,
            alpha: [vec![0.0; cells], vec![0.0; cells]],
            best: [vec![Vec::new(); cells], vec![Vec::new(); cells]],
            touched: [Vec::new(), Vec::new()],
        }
    }

    #[inline]
    fn cell(&self, j: Tag, i: Tag) -> usize {
        j * self.num_tags + i
    }

    /// Clears the scores and paths of `slot`.
    pub fn reset(&mut self, slot: usize) {
        for cell in std::mem::take(&mut self.touched[slot]) {
            self.alpha[slot][cell] = 0.0;
            self.best[slot][cell].clear();
        }
    }

    #[inline]
    pub fn alpha(&self, slot: usize, j: Tag, i: Tag) -> Float {
        self.alpha[slot][self.cell(j, i)]
    }

    #[inline]
    pub fn set_alpha(&mut self, slot: usize, j: Tag, i: Tag, value: Float) {
        let cell = self.cell(j, i);
        self.alpha[slot][cell] = value;
        self.touched[slot].push(cell);
    }

    pub fn best(&self, slot: usize, j: Tag, i: Tag) -> &[Tag] {
        &self.best[slot][self.cell(j, i)]
    }

    /// Sets the best path of `(j, i)` in `slot` to the one of `(k, j)` in the
    /// other slot extended with `i`, or to `[i]` alone when `extend` is false.
    pub fn set_best(&mut self, slot: usize, k: Tag, j: Tag, i: Tag, extend: bool) {
        let cell = self.cell(j, i);
        let mut path = std::mem::take(&mut self.best[slot][cell]);
        path.clear();
        if extend {
            let prev = self.cell(k, j);
            path.extend_from_slice(&self.best[1 - slot][prev]);
        }
        path.push(i);
        self.best[slot][cell] = path;
        self.touched[slot].push(cell);
    }
}
