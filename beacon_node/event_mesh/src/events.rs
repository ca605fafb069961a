//! The tagged event vocabulary flowing between actors.

use types::{Hash256, IndexedAttestation, SignedBeaconBlock, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    /// The wall clock entered `slot`. Never dropped by inboxes.
    NewSlot(Slot),
    /// Closes `slot`; actors discard their per-slot state.
    SlotTerminal(Slot),
    /// Fork choice declared a head after importing a block at `slot`.
    HeadAfterNewBeaconBlock { slot: Slot, head_root: Hash256 },
    /// The latest head of each shard chain, as of `slot`.
    NewShardHeads { slot: Slot, shard_heads: Vec<Hash256> },
    /// Blocks published during `slot` that still lack a crosslink.
    NotCrosslinkedBlocksPublished { slot: Slot, block_roots: Vec<Hash256> },
    /// Attestations produced for `slot`.
    NewAttestations {
        slot: Slot,
        attestations: Vec<IndexedAttestation>,
    },
    /// Attestations from the slot before `slot`, now ready for inclusion.
    PrevSlotAttestationsPublished {
        slot: Slot,
        attestations: Vec<IndexedAttestation>,
    },
    /// A freshly proposed block for `slot`.
    NewBeaconBlock {
        slot: Slot,
        block: Box<SignedBeaconBlock>,
    },
}

impl MeshEvent {
    /// The slot this event belongs to.
    pub fn slot(&self) -> Slot {
        match self {
            MeshEvent::NewSlot(slot)
            | MeshEvent::SlotTerminal(slot)
            | MeshEvent::HeadAfterNewBeaconBlock { slot, .. }
            | MeshEvent::NewShardHeads { slot, .. }
            | MeshEvent::NotCrosslinkedBlocksPublished { slot, .. }
            | MeshEvent::NewAttestations { slot, .. }
            | MeshEvent::PrevSlotAttestationsPublished { slot, .. }
            | MeshEvent::NewBeaconBlock { slot, .. } => *slot,
        }
    }

    /// Critical events survive inbox overflow.
    pub fn is_critical(&self) -> bool {
        matches!(self, MeshEvent::NewSlot(_))
    }

    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshEvent::NewSlot(_) => "new_slot",
            MeshEvent::SlotTerminal(_) => "slot_terminal",
            MeshEvent::HeadAfterNewBeaconBlock { .. } => "head_after_new_beacon_block",
            MeshEvent::NewShardHeads { .. } => "new_shard_heads",
            MeshEvent::NotCrosslinkedBlocksPublished { .. } => "not_crosslinked_blocks_published",
            MeshEvent::NewAttestations { .. } => "new_attestations",
            MeshEvent::PrevSlotAttestationsPublished { .. } => "prev_slot_attestations_published",
            MeshEvent::NewBeaconBlock { .. } => "new_beacon_block",
        }
    }
}
