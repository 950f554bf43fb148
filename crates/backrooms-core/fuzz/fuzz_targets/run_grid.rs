#![no_main]

use backrooms_core::{Coord, Portal, PortalConfig, Rooms, GATE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut rooms = Rooms::new();
    for (row, line) in (0_i64..).zip(data.split(|&byte| byte == b'\n')) {
        let text: String = line.iter().copied().map(char::from).collect();
        let _ = rooms.write_line(Coord::new(0, -row, 0), Coord::new(1, 0, 0), &text);
    }
    if rooms.set_hallway_name(0, 0, Some(GATE)).is_err() {
        return;
    }

    let config = PortalConfig {
        total_step_ceiling: 500,
        per_rule_step_ceiling: 50,
        ..PortalConfig::captured(vec!["fuzz".to_string()])
    };
    let Ok(mut portal) = Portal::new(rooms, &config) else {
        return;
    };
    let _ = portal.run();
});
