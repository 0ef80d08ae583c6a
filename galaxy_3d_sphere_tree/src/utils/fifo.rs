/// Fixed-size ring queue of deferred work with cancellable cells.
///
/// `push` returns the cell index the entry was written to. Holding on to it
/// lets the owner cancel the entry later in O(1) (`cancel`), which leaves a
/// tombstone that `pop` silently skips. `flush` does the same by value with
/// a linear scan.
///
/// Two counters are tracked:
/// - `entry_count` → live entries (tombstones excluded)
/// - `occupied` → cells between tail and head (tombstones included)
///
/// The ring is full when `occupied == capacity`; `push` then returns `None`
/// and the caller decides what to do with the work.

pub struct Fifo<T> {
    cells: Vec<Option<T>>,
    /// Live entries
    count: usize,
    /// Cells in use, tombstones included
    occupied: usize,
    /// Next cell to write
    head: usize,
    /// Next cell to read
    tail: usize,
}

impl<T: Copy + PartialEq> Fifo<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![None; capacity],
            count: 0,
            occupied: 0,
            head: 0,
            tail: 0,
        }
    }

    /// Append an entry. Returns the cell it landed in, or `None` if the ring is full.
    pub fn push(&mut self, value: T) -> Option<usize> {
        if self.occupied == self.cells.len() {
            return None;
        }

        let cell = self.head;
        self.cells[cell] = Some(value);
        self.head = (self.head + 1) % self.cells.len();
        self.count += 1;
        self.occupied += 1;
        Some(cell)
    }

    /// Take the oldest live entry, skipping tombstones.
    pub fn pop(&mut self) -> Option<T> {
        while self.occupied > 0 {
            let cell = self.tail;
            self.tail = (self.tail + 1) % self.cells.len();
            self.occupied -= 1;

            if let Some(value) = self.cells[cell].take() {
                self.count -= 1;
                return Some(value);
            }
        }
        None
    }

    /// Tombstone `cell` if it still holds `value`.
    pub fn cancel(&mut self, cell: usize, value: T) -> bool {
        match self.cells.get_mut(cell) {
            Some(slot) if *slot == Some(value) => {
                *slot = None;
                self.count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Tombstone the first pending cell holding `value`.
    pub fn flush(&mut self, value: T) -> bool {
        let len = self.cells.len();
        for offset in 0..self.occupied {
            let cell = (self.tail + offset) % len;
            if self.cells[cell] == Some(value) {
                self.cells[cell] = None;
                self.count -= 1;
                return true;
            }
        }
        false
    }

    pub fn entry_count(&self) -> usize {
        self.count
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every entry, tombstones included.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
        self.count = 0;
        self.occupied = 0;
        self.head = 0;
        self.tail = 0;
    }
}

#[cfg(test)]
#[path = "fifo_tests.rs"]
mod tests;
