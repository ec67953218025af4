#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure build-phase system that turns player input into economy commands.

use tile_defence_core::{Command, Event, Phase, StructureId, StructureKind, TileCoord};

/// Player request delivered through the input boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    /// Chooses the structure kind used by subsequent placements.
    SelectStructureKind(StructureKind),
    /// Places the selected kind on a tile, or selects the structure already there.
    PlaceAt(TileCoord),
    /// Selects an existing structure for upgrading or selling.
    SelectStructure(StructureId),
    /// Upgrades the selected structure.
    UpgradeSelected,
    /// Sells the selected structure.
    SellSelected,
    /// Clears both the kind and the structure selection.
    Deselect,
}

/// Feedback produced while interpreting player input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderNotice {
    /// A structure kind was chosen for placement.
    KindSelected(StructureKind),
    /// An existing structure was selected.
    StructureSelected(StructureId),
    /// The selection was cleared.
    Deselected,
    /// The request needs a selection that does not exist.
    NothingSelected,
    /// Economy requests are only accepted while building.
    WrongPhase,
}

/// Build-phase system that holds the player's selection.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    phase: Phase,
    selected_kind: Option<StructureKind>,
    selected_structure: Option<StructureId>,
}

impl Builder {
    /// Creates a new builder system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::None,
            selected_kind: None,
            selected_structure: None,
        }
    }

    /// Structure kind used by the next placement, if any.
    #[must_use]
    pub const fn selected_kind(&self) -> Option<StructureKind> {
        self.selected_kind
    }

    /// Structure targeted by upgrade and sell requests, if any.
    #[must_use]
    pub const fn selected_structure(&self) -> Option<StructureId> {
        self.selected_structure
    }

    /// Consumes world events and an optional player action to emit builder
    /// commands.
    ///
    /// The `structure_at` closure should mirror the semantics of the world's
    /// `query::structure_at` helper so the system can identify the clicked
    /// structure. Requests that cannot be honoured produce a notice instead of
    /// a command.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        action: Option<PlayerAction>,
        mut structure_at: F,
        out: &mut Vec<Command>,
        notices: &mut Vec<BuilderNotice>,
    ) where
        F: FnMut(TileCoord) -> Option<StructureId>,
    {
        for event in events {
            match event {
                Event::PhaseChanged { phase } => {
                    self.phase = *phase;
                    if phase.is_terminal() {
                        self.selected_kind = None;
                        self.selected_structure = None;
                    }
                }
                Event::StructureSold { structure, .. } => {
                    if self.selected_structure == Some(*structure) {
                        self.selected_structure = None;
                    }
                }
                _ => {}
            }
        }

        let Some(action) = action else {
            return;
        };

        match action {
            PlayerAction::SelectStructureKind(kind) => {
                self.selected_kind = Some(kind);
                self.selected_structure = None;
                notices.push(BuilderNotice::KindSelected(kind));
            }
            PlayerAction::PlaceAt(coord) => {
                if let Some(structure) = structure_at(coord) {
                    self.selected_structure = Some(structure);
                    notices.push(BuilderNotice::StructureSelected(structure));
                    return;
                }

                let Some(kind) = self.selected_kind else {
                    notices.push(BuilderNotice::NothingSelected);
                    return;
                };

                if self.phase != Phase::Build {
                    notices.push(BuilderNotice::WrongPhase);
                    return;
                }

                self.selected_structure = None;
                out.push(Command::PlaceStructure { kind, coord });
            }
            PlayerAction::SelectStructure(structure) => {
                self.selected_structure = Some(structure);
                notices.push(BuilderNotice::StructureSelected(structure));
            }
            PlayerAction::UpgradeSelected => {
                if let Some(structure) = self.selected_for_economy(notices) {
                    out.push(Command::UpgradeStructure { structure });
                }
            }
            PlayerAction::SellSelected => {
                if let Some(structure) = self.selected_for_economy(notices) {
                    out.push(Command::SellStructure { structure });
                }
            }
            PlayerAction::Deselect => {
                self.selected_kind = None;
                self.selected_structure = None;
                notices.push(BuilderNotice::Deselected);
            }
        }
    }

    fn selected_for_economy(&self, notices: &mut Vec<BuilderNotice>) -> Option<StructureId> {
        let Some(structure) = self.selected_structure else {
            notices.push(BuilderNotice::NothingSelected);
            return None;
        };

        if self.phase != Phase::Build {
            notices.push(BuilderNotice::WrongPhase);
            return None;
        }

        Some(structure)
    }
}
