use crate::Error;

/// Owned row-major grid with packed rows.
///
/// Raster bands (`Image<f32>`), edge masks (`Image<bool>`) and seam cost
/// grids all use this layout: pixel `(x, y)` lives at `data()[y * width + x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

fn pixel_count(width: usize, height: usize) -> Result<usize, Error> {
    width.checked_mul(height).ok_or(Error::SizeMismatch {
        expected: usize::MAX,
        actual: 0,
    })
}

impl<T> Image<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        let expected = pixel_count(width, height)?;
        match data.len() {
            n if n == expected => Ok(Self { width, height, data }),
            actual => Err(Error::SizeMismatch { expected, actual }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.index(x, y).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.index(x, y).map(|i| &mut self.data[i])
    }

    /// Row `y`; panics past the last row.
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} outside grid of height {}", self.height);
        &self.data[y * self.width..][..self.width]
    }

    /// Mutable row `y`; panics past the last row.
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} outside grid of height {}", self.height);
        let w = self.width;
        &mut self.data[y * w..][..w]
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Image<U> {
        Image {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Image<T> {
    /// Panics when `width * height` overflows.
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        let n = pixel_count(width, height).expect("grid dimensions overflow");
        Self {
            width,
            height,
            data: vec![value; n],
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

/// Read-only borrow of an [`Image`], handed to detectors.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row `y`; panics past the last row.
    pub fn row(&self, y: usize) -> &'a [T] {
        assert!(y < self.height, "row {y} outside view of height {}", self.height);
        &self.data[y * self.width..][..self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::Image;
    use crate::Error;

    #[test]
    fn buffer_length_must_match_dimensions() {
        assert_eq!(
            Image::from_vec(4, 2, vec![0.0f32; 7]).unwrap_err(),
            Error::SizeMismatch {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn pixel_access_respects_bounds() {
        let mut grid = Image::new_fill(3, 2, 1.0f32);
        *grid.get_mut(2, 1).expect("in bounds") = 9999.0;
        grid.row_mut(0)[0] = 0.0;

        assert_eq!(grid.get(2, 1), Some(&9999.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
        assert_eq!(grid.row(1), &[1.0, 1.0, 9999.0]);

        let barriers = grid.map(|&c| c >= 9999.0);
        assert_eq!((barriers.width(), barriers.height()), (3, 2));
        assert_eq!(barriers.data().iter().filter(|&&b| b).count(), 1);
    }
}
