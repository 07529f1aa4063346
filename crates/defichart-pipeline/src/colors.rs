//! Stable color assignment for chart dimensions.

use defichart_common::{OTHERS, TIMESTAMP};
use defichart_config::PaletteConfig;
use std::collections::BTreeMap;

/// Maps every dimension name to a palette color.
///
/// Names other than `"Others"` are enumerated alphabetically and cycle
/// through the palette by index, so a name keeps its color across
/// recomputations of the same set. `"Others"` always gets the reserved
/// color. An empty palette falls back to the reserved color for everything.
pub fn assign_colors<'a>(
    names: impl IntoIterator<Item = &'a str>,
    palette: &PaletteConfig,
) -> BTreeMap<String, String> {
    let mut sorted: Vec<&str> = names.into_iter().filter(|n| *n != TIMESTAMP).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut colors = BTreeMap::new();
    let mut index = 0usize;
    for name in sorted {
        let color = if name == OTHERS || palette.colors.is_empty() {
            palette.others_color.clone()
        } else {
            let color = palette.colors[index % palette.colors.len()].clone();
            index += 1;
            color
        };
        colors.insert(name.to_string(), color);
    }

    colors
}
