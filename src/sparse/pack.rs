use super::SetVector;

const BITS: usize = u64::BITS as usize;

/// Bit-vector sets: `ceil(end / 64)` words per set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackSet {
    n_set: usize,
    end: usize,
    n_word: usize,
    data: Vec<u64>,
}

impl PackSet {
    #[inline]
    fn words(&self, i: usize) -> &[u64] {
        &self.data[i * self.n_word..(i + 1) * self.n_word]
    }
}

impl SetVector for PackSet {
    fn new(n_set: usize, end: usize) -> Self {
        let n_word = end.div_ceil(BITS);
        PackSet {
            n_set,
            end,
            n_word,
            data: vec![0; n_set * n_word],
        }
    }

    #[inline]
    fn n_set(&self) -> usize {
        self.n_set
    }

    #[inline]
    fn end(&self) -> usize {
        self.end
    }

    #[inline]
    fn clear(&mut self, i: usize) {
        self.data[i * self.n_word..(i + 1) * self.n_word].fill(0);
    }

    #[inline]
    fn add_element(&mut self, i: usize, element: usize) {
        debug_assert!(element < self.end);
        self.data[i * self.n_word + element / BITS] |= 1 << (element % BITS);
    }

    #[inline]
    fn is_element(&self, i: usize, element: usize) -> bool {
        self.data[i * self.n_word + element / BITS] & (1 << (element % BITS)) != 0
    }

    #[inline]
    fn is_empty(&self, i: usize) -> bool {
        self.words(i).iter().all(|&w| w == 0)
    }

    fn assign(&mut self, dst: usize, src: usize) {
        if dst != src {
            let n = self.n_word;
            self.data.copy_within(src * n..(src + 1) * n, dst * n);
        }
    }

    fn union_with(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let n = self.n_word;
        for k in 0..n {
            self.data[dst * n + k] |= self.data[src * n + k];
        }
    }

    fn union_from(&mut self, dst: usize, other: &Self, src: usize) {
        debug_assert_eq!(self.end, other.end);
        let n = self.n_word;
        for (d, s) in self.data[dst * n..(dst + 1) * n].iter_mut().zip(other.words(src)) {
            *d |= *s;
        }
    }

    fn for_each(&self, i: usize, mut f: impl FnMut(usize)) {
        for (k, &word) in self.words(i).iter().enumerate() {
            let mut w = word;
            while w != 0 {
                let bit = w.trailing_zeros() as usize;
                f(k * BITS + bit);
                w &= w - 1;
            }
        }
    }

    fn nnz(&self) -> usize {
        self.data.iter().map(|w| w.count_ones() as usize).sum()
    }
}
