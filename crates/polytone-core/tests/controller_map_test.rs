use polytone_core::{controller_value, ControlTable, ControllerMap};
use polytone_ports::voice::ZoneSpec;
use pretty_assertions::assert_eq;

fn table() -> ControlTable {
    ControlTable::build(
        &[
            ZoneSpec::slider("pan", 0.0, -5.0, 5.0, 0.1).meta("midi", "ctrl 10"),
            ZoneSpec::toggle("hold").meta("midi", "ctrl 64"),
            ZoneSpec::slider("brightness", 0.5, 0.0, 1.0, 0.01)
                .meta("midi", "ctrl 127")
                .meta("midi", "ctrl 10"),
            ZoneSpec::meter("level", 0.0, 1.0),
        ],
        false,
    )
}

#[test]
fn continuous_controls_span_min_to_max() {
    let table = table();
    let pan = table.input(0);
    assert_eq!(controller_value(pan, 0), -5.0);
    assert_eq!(controller_value(pan, 64), 0.0);
    assert_eq!(controller_value(pan, 127), 5.0);
    assert_eq!(controller_value(pan, 200), 5.0);
}

#[test]
fn toggles_switch_at_the_midpoint() {
    let table = table();
    let hold = table.input(1);
    assert_eq!(controller_value(hold, 0), 0.0);
    assert_eq!(controller_value(hold, 63), 0.0);
    assert_eq!(controller_value(hold, 64), 1.0);
    assert_eq!(controller_value(hold, 127), 1.0);
}

#[test]
fn first_declaration_of_a_controller_wins() {
    let map = ControllerMap::new(&table());
    assert_eq!(map.lookup(10), Some(0));
    assert_eq!(map.lookup(64), Some(1));
    assert_eq!(map.lookup(127), Some(2));
    assert_eq!(map.lookup(7), None);
    assert_eq!(
        map.mapped().collect::<Vec<_>>(),
        vec![(10, 0), (64, 1), (127, 2)]
    );
}

#[test]
fn out_of_range_controller_numbers_clamp() {
    let map = ControllerMap::new(&table());
    assert_eq!(map.lookup(200), Some(2));
    assert_eq!(map.lookup(138), Some(2));
}
