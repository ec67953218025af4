use tile_defence_core::{Command, Event, Phase, StructureId, StructureKind, TileCoord};
use tile_defence_system_builder::{Builder, BuilderNotice, PlayerAction};

const CANNON: StructureKind = StructureKind::new(1);

fn build_phase() -> Builder {
    let mut builder = Builder::new();
    let mut commands = Vec::new();
    let mut notices = Vec::new();
    builder.handle(
        &[Event::PhaseChanged {
            phase: Phase::Build,
        }],
        None,
        |_| None,
        &mut commands,
        &mut notices,
    );
    assert!(commands.is_empty());
    assert!(notices.is_empty());
    builder
}

fn act(
    builder: &mut Builder,
    action: PlayerAction,
    occupant: Option<StructureId>,
) -> (Vec<Command>, Vec<BuilderNotice>) {
    let mut commands = Vec::new();
    let mut notices = Vec::new();
    builder.handle(&[], Some(action), |_| occupant, &mut commands, &mut notices);
    (commands, notices)
}

#[test]
fn placing_with_selected_kind_emits_place_command() {
    let mut builder = build_phase();
    let (_, notices) = act(&mut builder, PlayerAction::SelectStructureKind(CANNON), None);
    assert_eq!(notices, vec![BuilderNotice::KindSelected(CANNON)]);

    let coord = TileCoord::new(2, 3);
    let (commands, notices) = act(&mut builder, PlayerAction::PlaceAt(coord), None);

    assert_eq!(
        commands,
        vec![Command::PlaceStructure {
            kind: CANNON,
            coord
        }],
        "builder should emit a placement command for the selected kind",
    );
    assert!(notices.is_empty());
}

#[test]
fn placing_without_selection_reports_notice() {
    let mut builder = build_phase();
    let (commands, notices) = act(&mut builder, PlayerAction::PlaceAt(TileCoord::new(0, 0)), None);

    assert!(commands.is_empty());
    assert_eq!(notices, vec![BuilderNotice::NothingSelected]);
}

#[test]
fn clicking_an_occupied_tile_selects_its_structure() {
    let mut builder = build_phase();
    let _ = act(&mut builder, PlayerAction::SelectStructureKind(CANNON), None);
    let existing = StructureId::new(4);

    let (commands, notices) = act(
        &mut builder,
        PlayerAction::PlaceAt(TileCoord::new(1, 1)),
        Some(existing),
    );

    assert!(commands.is_empty());
    assert_eq!(notices, vec![BuilderNotice::StructureSelected(existing)]);
    assert_eq!(builder.selected_structure(), Some(existing));

    let (commands, _) = act(&mut builder, PlayerAction::UpgradeSelected, None);
    assert_eq!(
        commands,
        vec![Command::UpgradeStructure {
            structure: existing
        }]
    );
}

#[test]
fn economy_requests_outside_build_phase_are_refused() {
    let mut builder = build_phase();
    let _ = act(&mut builder, PlayerAction::SelectStructureKind(CANNON), None);
    let _ = act(
        &mut builder,
        PlayerAction::SelectStructure(StructureId::new(0)),
        None,
    );

    let mut commands = Vec::new();
    let mut notices = Vec::new();
    builder.handle(
        &[Event::PhaseChanged { phase: Phase::Wave }],
        Some(PlayerAction::SellSelected),
        |_| None,
        &mut commands,
        &mut notices,
    );
    assert!(commands.is_empty());
    assert_eq!(notices, vec![BuilderNotice::WrongPhase]);

    let (commands, notices) = act(&mut builder, PlayerAction::PlaceAt(TileCoord::new(3, 3)), None);
    assert!(commands.is_empty());
    assert_eq!(notices, vec![BuilderNotice::WrongPhase]);
}

#[test]
fn selling_clears_the_structure_selection() {
    let mut builder = build_phase();
    let structure = StructureId::new(9);
    let _ = act(&mut builder, PlayerAction::SelectStructure(structure), None);
    let (commands, _) = act(&mut builder, PlayerAction::SellSelected, None);
    assert_eq!(commands, vec![Command::SellStructure { structure }]);

    let mut commands = Vec::new();
    let mut notices = Vec::new();
    builder.handle(
        &[Event::StructureSold {
            structure,
            coord: TileCoord::new(0, 0),
            refund: 10,
        }],
        None,
        |_| None,
        &mut commands,
        &mut notices,
    );
    assert_eq!(builder.selected_structure(), None);

    let (commands, notices) = act(&mut builder, PlayerAction::SellSelected, None);
    assert!(commands.is_empty());
    assert_eq!(notices, vec![BuilderNotice::NothingSelected]);
}

#[test]
fn deselect_clears_everything() {
    let mut builder = build_phase();
    let _ = act(&mut builder, PlayerAction::SelectStructureKind(CANNON), None);
    let (_, notices) = act(&mut builder, PlayerAction::Deselect, None);

    assert_eq!(notices, vec![BuilderNotice::Deselected]);
    assert_eq!(builder.selected_kind(), None);
    assert_eq!(builder.selected_structure(), None);
}
