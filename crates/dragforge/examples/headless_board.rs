//! A kanban board without a UI: one card dragged across three lanes.
//!
//! Run:
//!   RUST_LOG=dragforge=debug cargo run -p dragforge --example headless_board

use std::cell::RefCell;
use std::rc::Rc;

use dragforge::prelude::*;
use dragforge::{insertion_index, is_horizontal_layout};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), dragforge::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tree = ElementTree::default();
    let root = tree.create(None, Some(Rect::new(0.0, 0.0, 960.0, 640.0)));
    let lanes: Vec<(&str, ElementId)> = ["todo", "doing", "done"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let x = 20.0 + 310.0 * i as f64;
            (name, tree.create(Some(root), Some(Rect::new(x, 20.0, 300.0, 600.0))))
        })
        .collect();
    let card = tree.create(Some(lanes[0].1), Some(Rect::new(30.0, 40.0, 280.0, 60.0)));
    let neighbours = [
        Rect::new(640.0, 40.0, 280.0, 60.0),
        Rect::new(640.0, 110.0, 280.0, 60.0),
    ];

    let mut config = EngineConfig::default();
    config.collision.throttle_ms = 0;
    let mut engine = DragEngine::builder(tree, root).config(config).build()?;
    engine.register_draggable(DraggableNode::new("card-1", card).with_data(Rc::new("Write docs")));
    for (name, element) in &lanes {
        engine.register_drop_target(DropTarget::new(*name, *element));
    }

    let transcript = Rc::new(RefCell::new(Vec::new()));
    for kind in DragEventKind::ALL {
        let transcript = Rc::clone(&transcript);
        engine.on(kind, move |event: &DragEvent| {
            let target = event.target.as_ref().map_or("-", |t| t.as_str());
            transcript.borrow_mut().push(format!(
                "{:<10} pos=({:>5.1},{:>5.1}) target={target}",
                event.kind.as_str(),
                event.position.x,
                event.position.y,
            ));
        });
    }

    engine.handle_input(&RawInput::pointer_down(card, Point::new(170.0, 70.0)));
    for step in 1..=12 {
        let x = 170.0 + 50.0 * f64::from(step);
        engine.handle_input(&RawInput::pointer_move(Point::new(x, 120.0)));
        if step % 3 == 0 {
            engine.tick();
        }
        if let (Some(best), Some(rect)) = (engine.best_target(), engine.drag_rect())
            && best.target.as_str() == "done"
        {
            let index = insertion_index(&neighbours, rect.center());
            let axis = if is_horizontal_layout(&neighbours) { "row" } else { "column" };
            println!("placeholder in {} at index {index} ({axis})", best.target);
        }
    }
    engine.handle_input(&RawInput::pointer_up(Point::new(770.0, 120.0)));

    for line in transcript.borrow().iter() {
        println!("{line}");
    }
    Ok(())
}
