/// Order in which an image's rows arrive in the compressed stream.
///
/// Interlaced images use the four-pass GIF schedule: every 8th row from 0,
/// every 8th from 4, every 4th from 2, then every 2nd from 1.
#[derive(Debug, Clone)]
pub struct RowSchedule {
    height: usize,
    interlaced: bool,
    row: usize,
    step: usize,
    pass: u8,
    done: bool,
}

impl RowSchedule {
    pub fn new(height: usize, interlaced: bool) -> Self {
        RowSchedule {
            height,
            interlaced,
            row: 0,
            step: if interlaced { 8 } else { 1 },
            pass: 0,
            done: height == 0,
        }
    }

    fn next_interlaced_row(&mut self) {
        self.row += self.step;
        while self.row >= self.height {
            self.pass += 1;
            (self.row, self.step) = match self.pass {
                1 => (4, 8),
                2 => (2, 4),
                3 => (1, 2),
                _ => {
                    self.done = true;
                    return;
                }
            };
        }
    }
}

impl Iterator for RowSchedule {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let ret = self.row;
        if self.interlaced {
            self.next_interlaced_row();
        } else {
            self.row += 1;
            self.done = self.row >= self.height;
        }
        Some(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_rows() {
        let rows: Vec<usize> = RowSchedule::new(3, false).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(RowSchedule::new(0, false).count(), 0);
    }

    #[test]
    fn eight_row_interlace() {
        let rows: Vec<usize> = RowSchedule::new(8, true).collect();
        assert_eq!(rows, vec![0, 4, 2, 6, 1, 3, 5, 7]);
    }

    #[test]
    fn interlace_covers_every_row_once() {
        for height in 0..40 {
            let mut rows: Vec<usize> = RowSchedule::new(height, true).collect();
            rows.sort_unstable();
            assert_eq!(rows, (0..height).collect::<Vec<_>>(), "height {}", height);
        }
    }

    #[test]
    fn short_interlaced_images_skip_empty_passes() {
        let rows: Vec<usize> = RowSchedule::new(1, true).collect();
        assert_eq!(rows, vec![0]);
        let rows: Vec<usize> = RowSchedule::new(3, true).collect();
        assert_eq!(rows, vec![0, 2, 1]);
        let rows: Vec<usize> = RowSchedule::new(10, true).collect();
        assert_eq!(rows, vec![0, 8, 4, 2, 6, 1, 3, 5, 7, 9]);
    }
}
