use super::SetVector;

const NIL: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    value: u32,
    next: u32,
}

/// Sorted singly linked sets sharing one node pool.
///
/// Freed nodes go on a free list and are reused before the pool grows, so a
/// sweep that repeatedly clears and refills sets stays within the peak
/// number of live elements.
#[derive(Clone, Debug, Default)]
pub struct ListSet {
    n_set: usize,
    end: usize,
    start: Vec<u32>,
    pool: Vec<Node>,
    free: u32,
    scratch: Vec<u32>,
}

impl ListSet {
    fn alloc(&mut self, value: u32, next: u32) -> u32 {
        if self.free != NIL {
            let n = self.free;
            self.free = self.pool[n as usize].next;
            self.pool[n as usize] = Node { value, next };
            n
        } else {
            self.pool.push(Node { value, next });
            (self.pool.len() - 1) as u32
        }
    }

    fn release(&mut self, mut n: u32) {
        while n != NIL {
            let next = self.pool[n as usize].next;
            self.pool[n as usize].next = self.free;
            self.free = n;
            n = next;
        }
    }

    fn values(&self, i: usize, out: &mut Vec<u32>) {
        let mut n = self.start[i];
        while n != NIL {
            let node = self.pool[n as usize];
            out.push(node.value);
            n = node.next;
        }
    }

    /// Replace set `i` with the sorted `values`.
    fn rebuild(&mut self, i: usize, values: &[u32]) {
        let old = std::mem::replace(&mut self.start[i], NIL);
        self.release(old);
        let mut head = NIL;
        for &v in values.iter().rev() {
            head = self.alloc(v, head);
        }
        self.start[i] = head;
    }

    /// Merge the sorted `add` into set `dst`.
    fn merge(&mut self, dst: usize, add: &[u32]) {
        if add.is_empty() {
            return;
        }
        let mut current = Vec::new();
        self.values(dst, &mut current);
        let mut merged = Vec::with_capacity(current.len() + add.len());
        let (mut a, mut b) = (0, 0);
        while a < current.len() || b < add.len() {
            let next = match (current.get(a), add.get(b)) {
                (Some(&x), Some(&y)) if x == y => {
                    a += 1;
                    b += 1;
                    x
                }
                (Some(&x), Some(&y)) if x < y => {
                    a += 1;
                    x
                }
                (Some(_), Some(&y)) | (None, Some(&y)) => {
                    b += 1;
                    y
                }
                (Some(&x), None) => {
                    a += 1;
                    x
                }
                (None, None) => break,
            };
            merged.push(next);
        }
        if merged.len() != current.len() {
            self.rebuild(dst, &merged);
        }
    }

    /// Number of pool nodes in use or on the free list.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}

impl SetVector for ListSet {
    fn new(n_set: usize, end: usize) -> Self {
        ListSet {
            n_set,
            end,
            start: vec![NIL; n_set],
            pool: Vec::new(),
            free: NIL,
            scratch: Vec::new(),
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

    fn clear(&mut self, i: usize) {
        let old = std::mem::replace(&mut self.start[i], NIL);
        self.release(old);
    }

    fn add_element(&mut self, i: usize, element: usize) {
        debug_assert!(element < self.end);
        let value = element as u32;
        let mut prev = NIL;
        let mut n = self.start[i];
        while n != NIL && self.pool[n as usize].value < value {
            prev = n;
            n = self.pool[n as usize].next;
        }
        if n != NIL && self.pool[n as usize].value == value {
            return;
        }
        let node = self.alloc(value, n);
        if prev == NIL {
            self.start[i] = node;
        } else {
            self.pool[prev as usize].next = node;
        }
    }

    fn is_element(&self, i: usize, element: usize) -> bool {
        let value = element as u32;
        let mut n = self.start[i];
        while n != NIL {
            let node = self.pool[n as usize];
            if node.value >= value {
                return node.value == value;
            }
            n = node.next;
        }
        false
    }

    #[inline]
    fn is_empty(&self, i: usize) -> bool {
        self.start[i] == NIL
    }

    fn assign(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let mut values = std::mem::take(&mut self.scratch);
        values.clear();
        self.values(src, &mut values);
        self.rebuild(dst, &values);
        self.scratch = values;
    }

    fn union_with(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let mut values = std::mem::take(&mut self.scratch);
        values.clear();
        self.values(src, &mut values);
        self.merge(dst, &values);
        self.scratch = values;
    }

    fn union_from(&mut self, dst: usize, other: &Self, src: usize) {
        debug_assert_eq!(self.end, other.end);
        let mut values = std::mem::take(&mut self.scratch);
        values.clear();
        other.values(src, &mut values);
        self.merge(dst, &values);
        self.scratch = values;
    }

    fn for_each(&self, i: usize, mut f: impl FnMut(usize)) {
        let mut n = self.start[i];
        while n != NIL {
            let node = self.pool[n as usize];
            f(node.value as usize);
            n = node.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_nodes_are_reused() {
        let mut s = ListSet::new(2, 100);
        for e in 0..10 {
            s.add_element(0, e);
        }
        let peak = s.pool_size();
        s.clear(0);
        for e in 50..60 {
            s.add_element(1, e);
        }
        assert_eq!(s.pool_size(), peak);
        assert_eq!(s.elements(1), (50..60).collect::<Vec<_>>());
    }
}
