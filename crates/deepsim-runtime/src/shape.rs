//! Layer shape descriptor
//!
//! A layer's units live in one flat buffer. The shape maps an n-dimensional
//! unit index onto that buffer through per-dimension strides. Row-major order
//! (outer-most dimension first) is the default; column-major is available for
//! layouts where the inner-most index comes first.

use core::fmt;

/// Dimension sizes, strides and optional dimension names
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    dims: Vec<usize>,
    strides: Vec<usize>,
    names: Vec<String>,
}

impl Shape {
    /// Create a row-major shape
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            strides: row_major_strides(dims),
            names: vec![String::new(); dims.len()],
        }
    }

    /// Create a column-major shape
    pub fn col_major(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            strides: col_major_strides(dims),
            names: vec![String::new(); dims.len()],
        }
    }

    /// Attach dimension names (missing names stay empty)
    pub fn with_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for (slot, name) in self.names.iter_mut().zip(names) {
            *slot = name.as_ref().to_string();
        }
        self
    }

    /// Total number of elements (product of the dimension sizes)
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// True if the shape holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of an n-dimensional index.
    ///
    /// No checking is done against the dimension sizes; extra index entries
    /// beyond the number of dimensions are ignored.
    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(i, s)| i * s)
            .sum()
    }

    /// Flat offset of an n-dimensional index, or `None` if it overflows `usize`.
    ///
    /// Like [`Shape::offset`] the result is not checked against `len()`.
    pub fn checked_offset(&self, index: &[usize]) -> Option<usize> {
        index
            .iter()
            .zip(&self.strides)
            .try_fold(0usize, |acc, (i, s)| acc.checked_add(i.checked_mul(*s)?))
    }

    /// Dimension sizes
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Per-dimension strides
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Dimension names
    pub fn dim_names(&self) -> &[String] {
        &self.names
    }

    /// Number of dimensions
    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// True if strides are the row-major strides of the dims
    pub fn is_row_major(&self) -> bool {
        self.strides == row_major_strides(&self.dims)
    }

    /// True if strides are the column-major strides of the dims
    pub fn is_col_major(&self) -> bool {
        self.strides == col_major_strides(&self.dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

/// Strides where the first dimension is outer-most
pub fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    if dims.iter().any(|&d| d == 0) {
        return vec![1; dims.len()];
    }
    let mut strides = vec![1; dims.len()];
    let mut rem = 1;
    for (stride, &d) in strides.iter_mut().zip(dims).rev() {
        *stride = rem;
        rem *= d;
    }
    strides
}

/// Strides where the first dimension is inner-most
pub fn col_major_strides(dims: &[usize]) -> Vec<usize> {
    if dims.iter().any(|&d| d == 0) {
        return vec![1; dims.len()];
    }
    let mut strides = Vec::with_capacity(dims.len());
    let mut total = 1;
    for &d in dims {
        strides.push(total);
        total *= d;
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_strides() {
        let sh = Shape::new(&[2, 3, 4]);
        assert_eq!(sh.len(), 24);
        assert_eq!(sh.strides(), &[12, 4, 1]);
        assert!(sh.is_row_major());
        assert!(!sh.is_col_major());

        let cm = Shape::col_major(&[2, 3, 4]);
        assert_eq!(cm.strides(), &[1, 2, 6]);
        assert!(cm.is_col_major());
    }

    #[test]
    fn test_offset() {
        let sh = Shape::new(&[3, 4]);
        assert_eq!(sh.offset(&[0, 0]), 0);
        assert_eq!(sh.offset(&[1, 2]), 6);
        assert_eq!(sh.offset(&[2, 3]), 11);
        // unchecked: runs past the end without complaint
        assert_eq!(sh.offset(&[3, 0]), 12);
    }

    #[test]
    fn test_checked_offset() {
        let sh = Shape::new(&[3, 4]);
        assert_eq!(sh.checked_offset(&[2, 3]), Some(11));
        assert_eq!(sh.checked_offset(&[3, 0]), Some(12));
        assert_eq!(sh.checked_offset(&[usize::MAX, 0]), None);
        assert_eq!(sh.checked_offset(&[usize::MAX / 4, 4]), None);
        assert_eq!(Shape::new(&[2, 2]).checked_offset(&[1usize << 63, 0]), None);
    }

    #[test]
    fn test_zero_sized_dims() {
        let sh = Shape::new(&[0, 5]);
        assert_eq!(sh.len(), 0);
        assert!(sh.is_empty());
        assert_eq!(sh.strides(), &[1, 1]);
    }

    #[test]
    fn test_names_and_display() {
        let sh = Shape::new(&[4, 4]).with_names(&["Y", "X"]);
        assert_eq!(sh.dim_names(), &["Y".to_string(), "X".to_string()]);
        assert_eq!(sh.to_string(), "[4, 4]");
        assert_eq!(sh.num_dims(), 2);
    }
}
