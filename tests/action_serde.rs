use kinema::{
    Action, FadeOutDirection, FadeOutTiles, GridSize, Point, QuadDeform, QuadMove, Vec2, Warp,
    Waves3D,
};

fn grid() -> GridSize {
    GridSize::new(8, 6).unwrap()
}

#[test]
fn composite_action_round_trips_through_json() {
    let action = (Action::MoveTo {
        position: Point::new(40.0, 20.0),
        duration: 1.5,
    } + Action::JumpBy {
        delta: Vec2::new(30.0, 0.0),
        height: 12.0,
        jumps: 3,
        duration: 2.0,
    }) | Action::accel_deccel(Action::fade_out(3.5));

    let json = serde_json::to_string(&action).unwrap();
    let back: Action = serde_json::from_str(&json).unwrap();
    assert_eq!(back, action);
    assert_eq!(back.duration(), action.duration());
}

#[test]
fn warp_blueprints_round_trip_through_json() {
    let warp = Action::Warp(Warp::Waves3D(Waves3D::new(grid(), 2.0, 4, 18.0).unwrap()))
        + Action::Warp(Warp::FadeOutTiles(
            FadeOutTiles::new(grid(), 1.0, FadeOutDirection::BottomLeft).unwrap(),
        ))
        + Action::StopGrid;

    let json = serde_json::to_string_pretty(&warp).unwrap();
    let back: Action = serde_json::from_str(&json).unwrap();
    assert_eq!(back, warp);
    assert!(back.validate().is_ok());
}

#[test]
fn quad_deform_round_trips_through_json() {
    let quad = Action::Warp(Warp::QuadMove(
        QuadMove::new(
            1.0,
            QuadDeform::MoveTo {
                bl: Point::new(1.0, 2.0),
                br: Point::new(3.0, 4.0),
                tr: Point::new(5.0, 6.0),
                tl: Point::new(7.0, 8.0),
            },
        )
        .unwrap(),
    ));
    let json = serde_json::to_string(&quad).unwrap();
    assert_eq!(serde_json::from_str::<Action>(&json).unwrap(), quad);
}

#[test]
fn deserialized_blueprints_still_validate() {
    // Hand-written JSON, the way a scene file would carry it.
    let json = r#"{
        "Loop": [
            { "Sequence": [
                { "MoveBy": { "delta": { "x": 10.0, "y": 0.0 }, "duration": 1.0 } },
                "ToggleVisibility"
            ] },
            4
        ]
    }"#;
    let action: Action = serde_json::from_str(json).unwrap();
    assert!(action.validate().is_ok());
    assert_eq!(action.duration(), Some(4.0));
}
