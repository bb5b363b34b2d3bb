//! Track-geometry helpers over a tile specification at a given orientation.

use trunkline_protocol::{Orientation, SideSet, TrackEnd};

use crate::catalog::TileType;

/// Board-facing sides connected by any track on `tile` at `orientation`.
pub fn connected_sides(tile: &TileType, orientation: Orientation) -> SideSet {
    let mut set = SideSet::EMPTY;
    for seg in &tile.segments {
        for side in seg.sides(orientation).iter() {
            set.insert(side);
        }
    }
    set
}

/// Board-facing sides with track running to `station` on `tile` at `orientation`.
pub fn station_sides(tile: &TileType, orientation: Orientation, station: u8) -> SideSet {
    let mut set = SideSet::EMPTY;
    for seg in &tile.segments {
        let touches = matches!(seg.a, TrackEnd::Station(n) if n == station)
            || matches!(seg.b, TrackEnd::Station(n) if n == station);
        if touches {
            for side in seg.sides(orientation).iter() {
                set.insert(side);
            }
        }
    }
    set
}

/// True when laying `new_tile` at `orientation` keeps every existing
/// connection alive: each side the current tile connects must still carry
/// track on the replacement.
pub fn preserves_connections(
    existing: SideSet,
    new_tile: &TileType,
    orientation: Orientation,
) -> bool {
    existing.is_subset_of(connected_sides(new_tile, orientation))
}

/// All orientations of `new_tile` that preserve `existing` connections.
/// Empty when the upgrade would sever track at every rotation.
pub fn valid_orientations(existing: SideSet, new_tile: &TileType) -> Vec<Orientation> {
    Orientation::ALL
        .into_iter()
        .filter(|o| preserves_connections(existing, new_tile, *o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{load_catalog, CatalogSource};
    use trunkline_protocol::Side;

    #[test]
    fn connected_sides_respects_orientation() {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let tile7 = catalog.tile(catalog.lookup("7").unwrap());

        let flat = connected_sides(tile7, Orientation(0));
        assert!(flat.contains(Side(0)) && flat.contains(Side(1)));

        let turned = connected_sides(tile7, Orientation(3));
        assert!(turned.contains(Side(3)) && turned.contains(Side(4)));
    }

    #[test]
    fn station_sides_only_counts_track_to_that_station() {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let twin = catalog.tile(catalog.lookup("twin").unwrap());

        let s0 = station_sides(twin, Orientation(0), 0);
        let s1 = station_sides(twin, Orientation(0), 1);
        assert!(s0.contains(Side(0)) && !s0.contains(Side(3)));
        assert!(s1.contains(Side(3)) && !s1.contains(Side(0)));
    }

    #[test]
    fn sharp_curve_has_no_straight_orientation() {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let tile7 = catalog.tile(catalog.lookup("7").unwrap());

        // A straight (0-3) connection can never be preserved by a sharp curve.
        let existing: SideSet = [Side(0), Side(3)].into_iter().collect();
        assert!(valid_orientations(existing, tile7).is_empty());
    }

    #[test]
    fn straight_upgrade_keeps_both_ends() {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let tile18 = catalog.tile(catalog.lookup("18").unwrap());

        let existing: SideSet = [Side(0), Side(3)].into_iter().collect();
        let orientations = valid_orientations(existing, tile18);
        assert!(!orientations.is_empty());
        for o in orientations {
            assert!(preserves_connections(existing, tile18, o));
        }
    }
}
