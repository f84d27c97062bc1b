//! Test data generators for creating synthetic field data.
//!
//! These generators create predictable, verifiable patterns so that tests
//! can tell exactly which element ended up where after a transform.

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Creates data encoding each element's multi-index as decimal digits.
///
/// Element `[i, j, k]` holds `i * 100 + j * 10 + k`, which makes a
/// transposed or rolled array easy to read off. Extents must stay below 10.
///
/// # Example
///
/// ```
/// use test_utils::create_index_encoded;
///
/// let data = create_index_encoded(&[2, 3]);
/// assert_eq!(data[5], 12.0); // element [1, 2]
/// ```
pub fn create_index_encoded(shape: &[usize]) -> Vec<f64> {
    (0..element_count(shape))
        .map(|flat| encode_index(&unravel(flat, shape)))
        .collect()
}

/// Value [`create_index_encoded`] stores at `index`.
pub fn encode_index(index: &[usize]) -> f64 {
    index.iter().fold(0.0, |acc, &i| acc * 10.0 + i as f64)
}

/// Row-major multi-index of a flat offset.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &extent) in index.iter_mut().zip(shape).rev() {
        if extent > 0 {
            *slot = flat % extent;
            flat /= extent;
        }
    }
    index
}

/// Creates data with every element set to `value`.
pub fn create_constant(shape: &[usize], value: f64) -> Vec<f64> {
    vec![value; element_count(shape)]
}

/// Every cyclic rotation of an axes order.
pub fn rotations<S: AsRef<str>>(order: &[S]) -> Vec<Vec<String>> {
    let names: Vec<String> = order.iter().map(|s| s.as_ref().to_string()).collect();
    (0..names.len().max(1))
        .map(|shift| {
            let mut rotated = names.clone();
            if !rotated.is_empty() {
                rotated.rotate_left(shift);
            }
            rotated
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_index_encoded() {
        let data = create_index_encoded(&[2, 3, 4]);
        assert_eq!(data.len(), 24);
        assert_eq!(data[0], 0.0);
        assert_eq!(data[23], 123.0);
        assert_eq!(data[4 + 1], encode_index(&[0, 1, 1]));
    }

    #[test]
    fn test_unravel() {
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
        assert_eq!(unravel(0, &[4]), vec![0]);
    }

    #[test]
    fn test_create_constant() {
        assert!(create_constant(&[3, 3], 1.5).iter().all(|v| *v == 1.5));
    }

    #[test]
    fn test_rotations() {
        let all = rotations(&["a", "b", "c"]);
        assert_eq!(all.len(), 3);
        assert_eq!(all[1], vec!["b", "c", "a"]);
        assert_eq!(rotations::<&str>(&[]), vec![Vec::<String>::new()]);
    }
}
