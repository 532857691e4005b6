use rand::Rng;

/// A uniform reservoir sample of a stream of values (Vitter's algorithm R).
#[derive(Debug)]
pub(crate) struct UniformSample {
    count: u64,
    size: usize,
    values: Vec<i64>,
}

impl UniformSample {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            count: 0,
            size: size.max(1),
            values: Vec::new(),
        }
    }

    pub(crate) fn update(&mut self, value: i64) {
        self.count += 1;
        if self.values.len() < self.size {
            self.values.push(value);
        } else {
            let slot = rand::rng().random_range(0..self.count);
            if let Ok(slot) = usize::try_from(slot) {
                if slot < self.size {
                    self.values[slot] = value;
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.count = 0;
        self.values.clear();
    }

    /// Total number of values ever recorded, including evicted ones.
    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn values(&self) -> &[i64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservoir_is_bounded() {
        let mut sample = UniformSample::new(100);
        for i in 0..10_000 {
            sample.update(i);
        }
        assert_eq!(sample.count(), 10_000);
        assert_eq!(sample.values().len(), 100);
        assert!(sample.values().iter().all(|v| (0..10_000).contains(v)));
    }

    #[test]
    fn test_clear() {
        let mut sample = UniformSample::new(4);
        sample.update(1);
        sample.update(2);
        sample.clear();
        assert_eq!(sample.count(), 0);
        assert!(sample.values().is_empty());
    }
}
