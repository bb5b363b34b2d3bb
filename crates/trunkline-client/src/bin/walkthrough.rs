//! Scripted walkthrough of one operating round: a tile upgrade, a home
//! token, a revenue run and the payout decision, driven through the
//! controller exactly as a widget layer would.

use std::thread;
use std::time::Duration;

use tracing::info;

use trunkline_client::{
    Controller, ControllerConfig, Gesture, ScriptedEngine, StaticOracle, VariantRegistry,
};
use trunkline_core::BoardState;
use trunkline_protocol::{
    ColourQuota, Hex, Orientation, PayoutSplit, Permission, Side, TileColour,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trunkline=info,walkthrough=info".into()),
        )
        .init();

    let registry = VariantRegistry::with_base();
    let config = ControllerConfig::default();
    let data = registry.resolve(&config.variant)?;

    let mut board = BoardState::new();
    let city = data
        .catalog
        .lookup("city")
        .ok_or("base catalog is missing the preprinted city tile")?;
    let plain = data
        .catalog
        .lookup("plain")
        .ok_or("base catalog is missing the preprinted plain tile")?;
    let home = board.add_hex(Hex { q: 0, r: 0 }, city, Orientation(0), &data.catalog)?;
    board.add_hex(Hex { q: 1, r: 0 }, plain, Orientation(0), &data.catalog)?;
    let company = board.add_company("B&O", vec![home], 3);

    let trains: Vec<_> = data.trains.ids().collect();
    let engine = ScriptedEngine::new(vec![
        vec![Permission::LayTileGeneric {
            company,
            quota: ColourQuota {
                colour: TileColour::Yellow,
                remaining: 1,
            },
        }],
        vec![Permission::LayTokenHomeCity { company }],
        vec![Permission::SetRevenue { company, trains }],
        vec![Permission::SelectPayout {
            company,
            revenue: 20,
        }],
        Vec::new(),
    ]);
    let oracle = StaticOracle {
        hexes: board.hex_ids().collect(),
        stops: board.hex(home).stops.iter().copied().collect(),
        sides: Side::ALL.into_iter().collect(),
    };

    let mut controller = Controller::new(engine, oracle, board, data, config)?;
    controller.begin_decision_point();
    info!("state: {:?}", controller.state());

    // Upgrade the home city.
    controller.on_gesture(Gesture::SelectHex(home));
    controller.on_gesture(Gesture::PickCandidate(0));
    controller.on_gesture(Gesture::Confirm);
    info!("state after tile lay: {:?}", controller.state());

    // The accepted lay advanced the feed to the home-token permission.
    let stop = controller.board().hex(home).stops[0];
    controller.on_gesture(Gesture::SelectStop(stop));
    controller.on_gesture(Gesture::Confirm);
    info!("state after token: {:?}", controller.state());

    // Revenue: give the advisory worker a moment, then take its suggestion.
    thread::sleep(Duration::from_millis(50));
    controller.drain_advisory();
    let suggested = controller.view().suggested_revenue.unwrap_or(20);
    info!("advisory suggests {}", suggested);
    controller.on_gesture(Gesture::RevenueEntered(suggested));

    controller.on_gesture(Gesture::PayoutChosen(PayoutSplit::Full));
    info!("walkthrough complete, state: {:?}", controller.state());
    Ok(())
}
