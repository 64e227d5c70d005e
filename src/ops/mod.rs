//! The operation set (C2): seven polymorphic transformations sharing one
//! capability contract, dispatched through a tagged `enum Operation` rather
//! than a trait-object hierarchy (see DESIGN.md for why).

pub mod clip;
pub mod demultiplex;
pub mod length;
pub mod quality;
pub mod random;
pub mod rename;
pub mod trim;

use crate::{
    record::ExtPair,
    stats::{OpStat, Side},
};

/// Which mate an operation instance is configured against. Distinct from
/// [`Side`] only in that it carries the capability contract's `Transform`
/// signature from §3 of the design, rather than being a bare statistics key.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReadSelector {
    R1,
    R2,
}

impl ReadSelector {
    pub fn side(self) -> Side {
        match self {
            ReadSelector::R1 => Side::R1,
            ReadSelector::R2 => Side::R2,
        }
    }
}

/// The result of one operation applied to one pair: `Keep` lets the pair
/// continue to the next operation on this side; `Drop` short-circuits the
/// remaining operations configured for this side.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Keep,
    Drop,
}

pub enum Operation {
    Clip(clip::Clip),
    Demultiplex(demultiplex::Demultiplex),
    Length(length::Length),
    Quality(quality::Quality),
    Random(random::Random),
    Rename(rename::Rename),
    Trim(trim::Trim),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Clip(_) => "clip",
            Operation::Demultiplex(_) => "demultiplex",
            Operation::Length(_) => "length",
            Operation::Quality(_) => "quality",
            Operation::Random(_) => "random",
            Operation::Rename(_) => "rename",
            Operation::Trim(_) => "trim",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Operation::Clip(op) => &op.label,
            Operation::Demultiplex(op) => &op.label,
            Operation::Length(op) => &op.label,
            Operation::Quality(op) => &op.label,
            Operation::Random(op) => &op.label,
            Operation::Rename(op) => &op.label,
            Operation::Trim(op) => &op.label,
        }
    }

    /// At most one configured operation instance (across both read sides)
    /// may answer `false` here; enforced by the configuration loader.
    pub fn is_thread_safe(&self) -> bool {
        !matches!(self, Operation::Rename(_))
    }

    /// Registers this operation's writer bins, returning the (possibly
    /// empty) list of bin names it contributes and the next free writer
    /// index. Only `Demultiplex` ever returns a non-empty list.
    pub fn get_dpx(&self, next_idx: usize) -> (Vec<String>, usize) {
        match self {
            Operation::Demultiplex(op) => op.get_dpx(next_idx),
            _ => (Vec::new(), next_idx),
        }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, stats: &mut OpStat, verbosity: u8) -> Status {
        match self {
            Operation::Clip(op) => op.transform(pair, side, stats, verbosity),
            Operation::Demultiplex(op) => op.transform(pair, side, stats, verbosity),
            Operation::Length(op) => op.transform(pair, side, stats, verbosity),
            Operation::Quality(op) => op.transform(pair, side, stats, verbosity),
            Operation::Random(op) => op.transform(pair, side, stats, verbosity),
            Operation::Rename(op) => op.transform(pair, side, stats, verbosity),
            Operation::Trim(op) => op.transform(pair, side, stats, verbosity),
        }
    }
}
