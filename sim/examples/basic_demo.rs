//! Basic demonstration of the Dread Halls simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=dread_sim=debug to watch the systems at work.

use dread_sim::{Direction, Intent, LevelLayout, Room, SimConfig, SimEvent, SimWorld};
use tracing_subscriber::EnvFilter;

const MAP: [&str; 11] = [
    "###################",
    "#.....#######.....#",
    "#.....#######.....#",
    "#.................#",
    "#.....####.##.....#",
    "#.....####.##.....#",
    "#######.......#####",
    "#######.......#####",
    "#######.......#####",
    "###################",
    "###################",
];

fn rooms() -> Vec<Room> {
    vec![
        Room::new(1, 1, 5, 5),
        Room::new(13, 1, 17, 5),
        Room::new(7, 6, 13, 8),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Dread Halls - Simulation Demo ===\n");

    let layout = LevelLayout::from_ascii(&MAP, rooms())?;
    let mut sim = SimWorld::from_layout(&layout, SimConfig::default())?;
    let created = sim.drain_events().len();
    println!("Level built: {created} entities announced\n");
    print_map(&mut sim, &layout);

    let script = [
        Intent::Move(Direction::E),
        Intent::Move(Direction::E),
        Intent::Rest,
        Intent::Move(Direction::S),
        Intent::BeginTargeting,
        Intent::Move(Direction::E),
        Intent::Move(Direction::E),
        Intent::ConfirmTarget,
        Intent::Move(Direction::W),
        Intent::Rest,
    ];

    for intent in script {
        let report = sim.submit(intent)?;
        let events = sim.drain_events();
        let animations = events
            .iter()
            .filter(|e| matches!(e, SimEvent::MoveAnimation(_)))
            .count();
        println!(
            "{intent:?}: passes={} tick={} animations={animations} events={}",
            report.passes,
            sim.current_tick(),
            events.len()
        );
        if let Some(preview) = sim.targeting_preview() {
            println!(
                "  aiming at {} (valid={}, {} cells)",
                preview.cursor,
                preview.valid,
                preview.path.len()
            );
        }
        if report.game_over || !report.player_alive {
            println!("  the run is over");
            break;
        }
    }

    println!();
    print_map(&mut sim, &layout);

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

/// Draw the map as the player knows it: bright glyphs for what is in view,
/// dim dots for remembered floor.
fn print_map(sim: &mut SimWorld, layout: &LevelLayout) {
    let mut rows: Vec<Vec<char>> = (0..layout.height)
        .map(|_| vec![' '; layout.width as usize])
        .collect();

    let knowledge = sim.player_knowledge().cloned().unwrap_or_default();
    for (pos, _) in knowledge.positions.iter() {
        if let (Ok(x), Ok(y)) = (usize::try_from(pos.x), usize::try_from(pos.y)) {
            if let Some(cell) = rows.get_mut(y).and_then(|r| r.get_mut(x)) {
                *cell = if knowledge.is_current(pos) { '.' } else { ',' };
            }
        }
    }

    for (_, pos, renderable) in sim.renderables() {
        if !knowledge.is_current(&pos.on_layer(0)) {
            continue;
        }
        let glyph = match renderable.image.as_str() {
            "wall" => '#',
            "player" => '@',
            "undead" => 'z',
            "lamp" => '*',
            "nest" => 'N',
            "portal" => 'O',
            "spent-bolt" => '/',
            _ => continue,
        };
        if let (Ok(x), Ok(y)) = (usize::try_from(pos.x), usize::try_from(pos.y)) {
            if let Some(cell) = rows.get_mut(y).and_then(|r| r.get_mut(x)) {
                *cell = glyph;
            }
        }
    }

    for row in rows {
        println!("  {}", row.into_iter().collect::<String>());
    }
}
