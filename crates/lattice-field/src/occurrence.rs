//! Disambiguation of repeated axes by occurrence rank.
//!
//! A gauge link carries the `color` axis twice. Which physical occurrence
//! is the row index and which the column index is itself a layout choice,
//! recorded as a sub-order: the list of ranks carried by the occurrences in
//! positional order.

use std::collections::BTreeSet;

use crate::error::{FieldError, Result};
use crate::types::{AxesOrder, AxisKey, SubOrders};

/// Label the occurrences of repeated axes with their ranks.
///
/// Names listed in `sub_orders` become [`AxisKey::Occurrence`] keys, using
/// the listed ranks for their occurrences in positional order; every other
/// name stays [`AxisKey::Plain`].
pub fn split<S: AsRef<str>>(axes_order: &[S], sub_orders: &SubOrders) -> Result<Vec<AxisKey>> {
    let mut keys: Vec<AxisKey> = axes_order
        .iter()
        .map(|name| AxisKey::plain(name.as_ref()))
        .collect();

    for (name, ranks) in sub_orders {
        let positions: Vec<usize> = axes_order
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_ref() == name)
            .map(|(i, _)| i)
            .collect();
        if positions.is_empty() {
            return Err(FieldError::unknown_axis(name.clone()));
        }
        validate_sub_order("split", name, ranks, positions.len())?;

        for (pos, rank) in positions.into_iter().zip(ranks) {
            keys[pos] = AxisKey::occurrence(name.clone(), *rank);
        }
    }
    Ok(keys)
}

/// Rebuild the flat axes order and sub-orders from labelled keys.
///
/// Inverse of [`split`]: `recombine(names, &split(order, subs)?)` returns
/// `(order, subs)`.
pub fn recombine<S: AsRef<str>>(
    axis_names: &[S],
    keys: &[AxisKey],
) -> Result<(AxesOrder, SubOrders)> {
    let mut order = Vec::with_capacity(keys.len());
    let mut sub_orders = SubOrders::new();

    for key in keys {
        let name = key.name();
        if !axis_names.iter().any(|n| n.as_ref() == name) {
            return Err(FieldError::unknown_axis(name));
        }
        order.push(name.to_string());
        if let Some(rank) = key.rank() {
            sub_orders.entry(name.to_string()).or_default().push(rank);
        }
    }
    Ok((AxesOrder::from(order), sub_orders))
}

/// Identity sub-orders for every repeated axis of an order.
pub fn default_sub_orders(axes_order: &AxesOrder) -> SubOrders {
    axes_order
        .repeated()
        .into_iter()
        .map(|name| (name.to_string(), (0..axes_order.count(name)).collect()))
        .collect()
}

/// Check that `ranks` is a permutation of `0..count`.
pub(crate) fn validate_sub_order(
    op: &'static str,
    name: &str,
    ranks: &[usize],
    count: usize,
) -> Result<()> {
    if ranks.len() != count {
        return Err(FieldError::invalid_params(
            op,
            format!(
                "axis '{name}' occurs {count} times but {} ranks were given",
                ranks.len()
            ),
        ));
    }
    let distinct: BTreeSet<usize> = ranks.iter().copied().collect();
    if distinct.len() != count || ranks.iter().any(|r| *r >= count) {
        return Err(FieldError::invalid_params(
            op,
            format!("ranks {ranks:?} of axis '{name}' are not a permutation of 0..{count}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(entries: &[(&str, &[usize])]) -> SubOrders {
        entries
            .iter()
            .map(|(name, ranks)| (name.to_string(), ranks.to_vec()))
            .collect()
    }

    #[test]
    fn test_split_labels_occurrences() {
        let order = ["x", "color", "y", "color"];
        let keys = split(&order, &subs(&[("color", &[1, 0])])).unwrap();
        assert_eq!(
            keys,
            vec![
                AxisKey::plain("x"),
                AxisKey::occurrence("color", 1),
                AxisKey::plain("y"),
                AxisKey::occurrence("color", 0),
            ]
        );
    }

    #[test]
    fn test_split_without_sub_orders_is_plain() {
        let keys = split(&["x", "color", "color"], &SubOrders::new()).unwrap();
        assert!(keys.iter().all(|k| k.rank().is_none()));
    }

    #[test]
    fn test_split_validation() {
        let order = ["x", "color", "color"];
        assert!(matches!(
            split(&order, &subs(&[("spin", &[0])])),
            Err(FieldError::UnknownAxis(_))
        ));
        assert!(matches!(
            split(&order, &subs(&[("color", &[0])])),
            Err(FieldError::ParameterValidation { .. })
        ));
        assert!(matches!(
            split(&order, &subs(&[("color", &[1, 1])])),
            Err(FieldError::ParameterValidation { .. })
        ));
        assert!(matches!(
            split(&order, &subs(&[("color", &[0, 2])])),
            Err(FieldError::ParameterValidation { .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        let names = ["t", "x", "spin", "color"];
        let cases: Vec<(Vec<&str>, SubOrders)> = vec![
            (vec!["t", "x"], SubOrders::new()),
            (
                vec!["color", "t", "color", "x"],
                subs(&[("color", &[1, 0])]),
            ),
            (
                vec!["spin", "color", "spin", "color", "t"],
                subs(&[("color", &[0, 1]), ("spin", &[1, 0])]),
            ),
            (
                vec!["spin", "spin", "spin", "x"],
                subs(&[("spin", &[2, 0, 1])]),
            ),
        ];

        for (order, sub_orders) in cases {
            let keys = split(&order, &sub_orders).unwrap();
            let (recovered, recovered_subs) = recombine(&names, &keys).unwrap();
            assert_eq!(recovered, AxesOrder::new(order.iter().copied()));
            assert_eq!(recovered_subs, sub_orders);
        }
    }

    #[test]
    fn test_recombine_unknown_axis() {
        let keys = vec![AxisKey::plain("x"), AxisKey::occurrence("flavor", 0)];
        assert_eq!(
            recombine(&["x"], &keys),
            Err(FieldError::UnknownAxis("flavor".to_string()))
        );
    }

    #[test]
    fn test_default_sub_orders() {
        let order = AxesOrder::new(["spin", "color", "spin", "color", "x"]);
        assert_eq!(
            default_sub_orders(&order),
            subs(&[("color", &[0, 1]), ("spin", &[0, 1])])
        );
    }
}
