//! Device Hierarchy and Command Rules.
//!
//! A memory standard declares its protocol once, as data, through the
//! [`CommandRules`] trait: which hierarchy level each command targets, which
//! command has to go first, whether an access hits the row buffer, which
//! timing constraints a committed command imposes, and how it changes node
//! state. The node tree in [`crate::dram::node`] walks these rules generically
//! and never makes scheduling decisions of its own.

use std::collections::HashMap;
use std::fmt;

use crate::common::RequestType;
use crate::dram::node::DramNode;

/// Structural level of the device hierarchy, outermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Channel,
    Rank,
    BankGroup,
    Bank,
    Row,
    Column,
}

impl Level {
    /// Number of levels.
    pub const COUNT: usize = 6;

    /// All levels in hierarchy order.
    pub const ALL: [Level; Level::COUNT] = [
        Level::Channel,
        Level::Rank,
        Level::BankGroup,
        Level::Bank,
        Level::Row,
        Level::Column,
    ];

    /// Position of the level in hierarchy order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next level down, if any.
    pub fn child(self) -> Option<Level> {
        Level::ALL.get(self.index() + 1).copied()
    }
}

/// Decoded device coordinates, indexed by [`Level::index`].
pub type AddrVec = [usize; Level::COUNT];

/// Protocol command issued to a device node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Act,
    Pre,
    Prea,
    Rd,
    Wr,
    Rda,
    Wra,
    Ref,
    Refsb,
    Pde,
    Pdx,
    Sre,
    Srx,
}

impl Command {
    /// Number of commands.
    pub const COUNT: usize = 13;

    /// All commands in declaration order.
    pub const ALL: [Command; Command::COUNT] = [
        Command::Act,
        Command::Pre,
        Command::Prea,
        Command::Rd,
        Command::Wr,
        Command::Rda,
        Command::Wra,
        Command::Ref,
        Command::Refsb,
        Command::Pde,
        Command::Pdx,
        Command::Sre,
        Command::Srx,
    ];

    /// Position of the command in declaration order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Mnemonic used in traces and reports.
    pub fn name(self) -> &'static str {
        match self {
            Command::Act => "ACT",
            Command::Pre => "PRE",
            Command::Prea => "PREA",
            Command::Rd => "RD",
            Command::Wr => "WR",
            Command::Rda => "RDA",
            Command::Wra => "WRA",
            Command::Ref => "REF",
            Command::Refsb => "REFSB",
            Command::Pde => "PDE",
            Command::Pdx => "PDX",
            Command::Sre => "SRE",
            Command::Srx => "SRX",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a hierarchy node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Opened,
    Closed,
    PowerUp,
    ActivePowerDown,
    PrecPowerDown,
    SelfRefresh,
}

/// Dominant classification of a command, as seen by a scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandClass {
    Opening,
    Accessing,
    Closing,
    Refreshing,
}

/// Rule function kinds that a standard may declare per (level, command).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Prerequisite,
    RowHit,
    RowOpen,
    Effect,
}

/// One timing constraint.
///
/// After the owning command commits at cycle `t` on a node, `next` may not
/// commit before `t + val` on the same node, or on a sibling node when
/// `sibling` is set. `dist` selects how many commits back the constraint
/// reaches (4 for a four-activate window).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingEntry {
    pub next: Command,
    pub dist: usize,
    pub val: u64,
    pub sibling: bool,
}

/// Timing constraints of one standard, keyed by (level, command).
#[derive(Debug, Default, Clone)]
pub struct TimingTable {
    entries: HashMap<(Level, Command), Vec<TimingEntry>>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a same-node constraint measured from the last commit.
    pub fn add(&mut self, level: Level, cmd: Command, next: Command, val: u64) {
        self.push(level, cmd, next, 1, val, false);
    }

    /// Adds a same-node constraint measured from the `dist`-th last commit.
    pub fn add_dist(&mut self, level: Level, cmd: Command, next: Command, dist: usize, val: u64) {
        self.push(level, cmd, next, dist, val, false);
    }

    /// Adds a constraint that applies to the sibling nodes of the target.
    pub fn add_sibling(&mut self, level: Level, cmd: Command, next: Command, val: u64) {
        self.push(level, cmd, next, 1, val, true);
    }

    /// Adds the same same-node constraint for several (command, successor) pairs.
    pub fn add_all(&mut self, level: Level, cmds: &[Command], nexts: &[Command], val: u64) {
        for &cmd in cmds {
            for &next in nexts {
                self.add(level, cmd, next, val);
            }
        }
    }

    fn push(&mut self, level: Level, cmd: Command, next: Command, dist: usize, val: u64, sibling: bool) {
        debug_assert!(dist >= 1, "timing distance must be at least one commit");
        self.entries.entry((level, cmd)).or_default().push(TimingEntry {
            next,
            dist,
            val,
            sibling,
        });
    }

    /// Constraints imposed by `cmd` at `level`.
    pub fn get(&self, level: Level, cmd: Command) -> &[TimingEntry] {
        self.entries
            .get(&(level, cmd))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Protocol description of one memory standard.
///
/// Implementations answer legality and timing questions; they never decide
/// what to issue. Calling a rule function for a (level, command) pair for
/// which [`CommandRules::has_rule`] is `false` is a precondition violation
/// and panics.
pub trait CommandRules {
    /// Name of the standard, e.g. `"HBM"`.
    fn name(&self) -> &str;

    /// Name of the selected speed bin.
    fn speed_name(&self) -> &str;

    /// The level a command targets.
    fn scope(&self, cmd: Command) -> Level;

    /// Initial state of nodes at `level`, or `None` if the level holds no state.
    fn start_state(&self, level: Level) -> Option<State>;

    /// Whether the standard declares a rule of this kind for the pair.
    fn has_rule(&self, rule: Rule, level: Level, cmd: Command) -> bool;

    /// Command that has to issue before `cmd` can issue below `node`.
    ///
    /// `None` means this level imposes nothing and the walk continues one
    /// level down. `child` is the id of the addressed child (the row id at
    /// bank level).
    fn prerequisite(&self, node: &DramNode, cmd: Command, child: usize) -> Option<Command>;

    /// Whether `cmd` would hit the open row of `node`.
    fn row_hit(&self, node: &DramNode, cmd: Command, child: usize) -> bool;

    /// Whether `node` has any row open.
    fn row_open(&self, node: &DramNode, cmd: Command, child: usize) -> bool;

    /// Timing constraints imposed by `cmd` at `level`.
    fn timing(&self, level: Level, cmd: Command) -> &[TimingEntry];

    /// Applies the state transition of a committed `cmd` to `node`.
    fn effect(&self, node: &mut DramNode, cmd: Command, child: usize);

    /// Dominant classification of a command.
    fn classify(&self, cmd: Command) -> Option<CommandClass>;

    /// Access command a request type resolves to.
    fn translate(&self, kind: RequestType) -> Command {
        match kind {
            RequestType::Read => Command::Rd,
            RequestType::Write => Command::Wr,
        }
    }

    /// Cycles from a read command to the end of its data burst.
    fn read_latency(&self) -> u64;

    /// Cycles from a write command to the end of its data burst.
    fn write_latency(&self) -> u64;

    /// Cycles between refreshes of one rank, if the standard refreshes.
    fn refresh_interval(&self) -> Option<u64>;

    /// Clock period in nanoseconds.
    fn clock_period_ns(&self) -> f64;

    fn is_opening(&self, cmd: Command) -> bool {
        matches!(cmd, Command::Act)
    }

    fn is_accessing(&self, cmd: Command) -> bool {
        matches!(cmd, Command::Rd | Command::Wr | Command::Rda | Command::Wra)
    }

    fn is_closing(&self, cmd: Command) -> bool {
        matches!(cmd, Command::Rda | Command::Wra | Command::Pre | Command::Prea)
    }

    fn is_refreshing(&self, cmd: Command) -> bool {
        matches!(cmd, Command::Ref | Command::Refsb)
    }
}

pub(crate) fn scope_violation(rule: Rule, level: Level, cmd: Command) -> ! {
    unreachable!("no {:?} rule declared for {} at {:?}", rule, cmd, level)
}

// Rule bodies shared by the HBM-family standards. The standards decide which
// (level, command) pairs use them.

/// Rank power gating: a powered-down rank has to wake up before anything else.
pub(crate) fn rank_wakeup(node: &DramNode) -> Option<Command> {
    match node.state {
        Some(State::PowerUp) => None,
        Some(State::ActivePowerDown) | Some(State::PrecPowerDown) => Some(Command::Pdx),
        Some(State::SelfRefresh) => Some(Command::Srx),
        _ => None,
    }
}

/// Row-buffer logic for column accesses at bank level.
pub(crate) fn bank_access(node: &DramNode, cmd: Command, row: usize) -> Option<Command> {
    match node.state {
        Some(State::Closed) => Some(Command::Act),
        Some(State::Opened) if node.row_state.contains_key(&row) => Some(cmd),
        Some(State::Opened) => Some(Command::Pre),
        _ => None,
    }
}

/// REF needs every bank of the rank closed.
pub(crate) fn rank_refresh(node: &DramNode) -> Option<Command> {
    if let Some(wake) = rank_wakeup(node) {
        return Some(wake);
    }
    let any_open = node
        .banks()
        .any(|bank| bank.state == Some(State::Opened));
    Some(if any_open { Command::Prea } else { Command::Ref })
}

/// PDE and SRE from whatever power state the rank is in.
pub(crate) fn rank_power_down(node: &DramNode, cmd: Command) -> Option<Command> {
    match (node.state, cmd) {
        (Some(State::SelfRefresh), Command::Pde) => Some(Command::Srx),
        (Some(State::ActivePowerDown), Command::Sre) | (Some(State::PrecPowerDown), Command::Sre) => {
            Some(Command::Pdx)
        }
        _ => Some(cmd),
    }
}

/// REFSB needs its own bank closed.
pub(crate) fn bank_refresh(node: &DramNode) -> Option<Command> {
    match node.state {
        Some(State::Closed) => Some(Command::Refsb),
        _ => Some(Command::Pre),
    }
}

pub(crate) fn bank_row_hit(node: &DramNode, row: usize) -> bool {
    node.state == Some(State::Opened) && node.row_state.contains_key(&row)
}

pub(crate) fn bank_row_open(node: &DramNode) -> bool {
    node.state == Some(State::Opened)
}

pub(crate) fn open_row(node: &mut DramNode, row: usize) {
    node.state = Some(State::Opened);
    node.row_state.insert(row, State::Opened);
}

pub(crate) fn close_bank(node: &mut DramNode) {
    node.state = Some(State::Closed);
    node.row_state.clear();
}

pub(crate) fn close_all_banks(node: &mut DramNode) {
    for bank in node.banks_mut() {
        close_bank(bank);
    }
}

/// Power-down lands in active or precharge power-down depending on open banks.
pub(crate) fn enter_power_down(node: &mut DramNode) {
    let any_open = node
        .banks()
        .any(|bank| bank.state == Some(State::Opened));
    node.state = Some(if any_open {
        State::ActivePowerDown
    } else {
        State::PrecPowerDown
    });
}
