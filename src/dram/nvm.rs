//! Non-volatile memory (NVM) command rules.
//!
//! An HBM-shaped device built from non-volatile cells: the command set and
//! hierarchy are unchanged, activation and write recovery are much slower,
//! and cells never need refreshing, so REF and REFSB carry no rules.
//! RAS and RC are not listed in the speed bin; they follow from the read
//! path (RCD + RTP_L) and from RAS + RP.

use crate::common::{SimError, SimResult};
use crate::dram::node::DramNode;
use crate::dram::rules::{self, Command, CommandClass, CommandRules, Level, Rule, State, TimingEntry, TimingTable};

/// One NVM speed bin.
#[derive(Debug, Clone, Copy)]
pub struct NvmSpeed {
    pub name: &'static str,
    pub rate: u32,
    pub freq_mhz: f64,
    pub t_ck: f64,
    pub n_bl: u64,
    pub n_ccd: u64,
    pub n_cl: u64,
    pub n_rcd: u64,
    pub n_rp: u64,
    pub n_rtpl: u64,
    pub n_rtps: u64,
    pub n_wtr: u64,
    pub n_wr: u64,
    pub n_rrds: u64,
    pub n_rrdl: u64,
    pub n_faw: u64,
    pub n_pd: u64,
    pub n_xp: u64,
    pub n_ckesr: u64,
    pub n_xs: u64,
    pub n_cke: u64,
    pub n_actpde: u64,
    pub n_prpde: u64,
    pub n_wl: u64,
    pub n_rtw: u64,
    pub n_wrapde: u64,
    pub n_wrpde: u64,
    pub n_rdpde: u64,
}

impl NvmSpeed {
    pub fn n_ras(&self) -> u64 {
        self.n_rcd + self.n_rtpl
    }

    pub fn n_rc(&self) -> u64 {
        self.n_ras() + self.n_rp
    }
}

/// 1 Gbps/pin, 500 MHz, 16 Gb per channel.
pub const NVM_1GBPS: NvmSpeed = NvmSpeed {
    name: "NVM_1Gbps",
    rate: 1000,
    freq_mhz: 500.0,
    t_ck: 2.0,
    n_bl: 2,
    n_ccd: 4,
    n_cl: 7,
    n_rcd: 25,
    n_rp: 1,
    n_rtpl: 3,
    n_rtps: 2,
    n_wtr: 4,
    n_wr: 75,
    n_rrds: 2,
    n_rrdl: 3,
    n_faw: 25,
    n_pd: 3,
    n_xp: 4,
    n_ckesr: 4,
    n_xs: 0,
    n_cke: 3,
    n_actpde: 1,
    n_prpde: 1,
    n_wl: 2,
    n_rtw: 5,
    n_wrapde: 12,
    n_wrpde: 12,
    n_rdpde: 5,
};

const SPEEDS: &[NvmSpeed] = &[NVM_1GBPS];

/// NVM protocol rules for one speed bin.
pub struct Nvm {
    speed: NvmSpeed,
    timing: TimingTable,
}

impl Nvm {
    pub fn new(speed: &str) -> SimResult<Self> {
        let speed = SPEEDS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(speed))
            .copied()
            .ok_or_else(|| SimError::UnknownSpeed {
                standard: "NVM".to_string(),
                speed: speed.to_string(),
            })?;
        Ok(Self {
            timing: init_timing(&speed),
            speed,
        })
    }

    pub fn speed(&self) -> &NvmSpeed {
        &self.speed
    }
}

fn init_timing(s: &NvmSpeed) -> TimingTable {
    use Command::*;
    use Level::*;

    let rd = [Rd, Rda];
    let wr = [Wr, Wra];
    let everything = [Act, Pre, Prea, Rd, Rda, Wr, Wra, Pde, Sre];
    let rda_to_act = s.n_rtpl + s.n_rp;
    let wr_to_pre = s.n_wl + s.n_bl + s.n_wr;
    let wra_to_act = wr_to_pre + s.n_rp;

    let mut t = TimingTable::new();

    t.add_all(Channel, &rd, &rd, s.n_bl);
    t.add_all(Channel, &wr, &wr, s.n_bl);

    t.add_all(Rank, &rd, &rd, s.n_ccd);
    t.add_all(Rank, &wr, &wr, s.n_ccd);
    t.add_all(Rank, &rd, &wr, s.n_rtw);
    t.add_all(Rank, &wr, &rd, s.n_wl + s.n_bl + s.n_wtr);
    t.add(Rank, Rd, Prea, s.n_rtpl);
    t.add(Rank, Wr, Prea, wr_to_pre);
    t.add(Rank, Act, Act, s.n_rrds);
    t.add_dist(Rank, Act, Act, 4, s.n_faw);
    t.add(Rank, Act, Prea, s.n_ras());
    t.add(Rank, Prea, Act, s.n_rp);
    t.add(Rank, Rda, Act, rda_to_act);
    t.add(Rank, Wra, Act, wra_to_act);

    t.add_all(Rank, &rd, &[Pde], s.n_rdpde);
    t.add(Rank, Wr, Pde, s.n_wrpde);
    t.add(Rank, Wra, Pde, s.n_wrapde);
    t.add(Rank, Act, Pde, s.n_actpde);
    t.add_all(Rank, &[Pre, Prea], &[Pde], s.n_prpde);
    t.add(Rank, Pde, Pdx, s.n_pd.max(s.n_cke));
    t.add_all(Rank, &[Pdx], &everything, s.n_xp);

    t.add(Rank, Act, Sre, s.n_rc());
    t.add_all(Rank, &[Pre, Prea], &[Sre], s.n_rp);
    t.add(Rank, Sre, Srx, s.n_ckesr);
    t.add_all(Rank, &[Srx], &everything, s.n_xs);

    t.add_all(BankGroup, &rd, &rd, s.n_ccd);
    t.add(BankGroup, Act, Act, s.n_rrdl);

    t.add(Bank, Act, Act, s.n_rc());
    t.add_all(Bank, &[Act], &rd, s.n_rcd);
    t.add_all(Bank, &[Act], &wr, s.n_rcd);
    t.add(Bank, Act, Pre, s.n_ras());
    t.add(Bank, Pre, Act, s.n_rp);
    t.add(Bank, Rd, Pre, s.n_rtps);
    t.add(Bank, Wr, Pre, wr_to_pre);
    t.add(Bank, Rda, Act, rda_to_act);
    t.add(Bank, Wra, Act, wra_to_act);

    t
}

impl CommandRules for Nvm {
    fn name(&self) -> &str {
        "NVM"
    }

    fn speed_name(&self) -> &str {
        self.speed.name
    }

    fn scope(&self, cmd: Command) -> Level {
        match cmd {
            Command::Act => Level::Row,
            Command::Pre | Command::Refsb => Level::Bank,
            Command::Rd | Command::Wr | Command::Rda | Command::Wra => Level::Column,
            Command::Prea
            | Command::Ref
            | Command::Pde
            | Command::Pdx
            | Command::Sre
            | Command::Srx => Level::Rank,
        }
    }

    fn start_state(&self, level: Level) -> Option<State> {
        match level {
            Level::Rank => Some(State::PowerUp),
            Level::Bank | Level::Row => Some(State::Closed),
            _ => None,
        }
    }

    fn has_rule(&self, rule: Rule, level: Level, cmd: Command) -> bool {
        use Command::*;
        match (rule, level) {
            (Rule::Prerequisite, Level::Rank) => {
                matches!(cmd, Act | Pre | Prea | Rd | Wr | Rda | Wra | Pde | Sre)
            }
            (Rule::Prerequisite, Level::Bank)
            | (Rule::RowHit, Level::Bank)
            | (Rule::RowOpen, Level::Bank) => matches!(cmd, Rd | Wr | Rda | Wra),
            (Rule::Effect, Level::Rank) => matches!(cmd, Prea | Pde | Pdx | Sre | Srx),
            (Rule::Effect, Level::Bank) => matches!(cmd, Act | Pre | Rda | Wra),
            _ => false,
        }
    }

    fn prerequisite(&self, node: &DramNode, cmd: Command, child: usize) -> Option<Command> {
        use Command::*;
        match (node.level, cmd) {
            (Level::Rank, Act | Pre | Prea | Rd | Wr | Rda | Wra) => rules::rank_wakeup(node),
            (Level::Rank, Pde | Sre) => rules::rank_power_down(node, cmd),
            (Level::Bank, Rd | Wr | Rda | Wra) => rules::bank_access(node, cmd, child),
            (level, _) => rules::scope_violation(Rule::Prerequisite, level, cmd),
        }
    }

    fn row_hit(&self, node: &DramNode, cmd: Command, child: usize) -> bool {
        match (node.level, cmd) {
            (Level::Bank, Command::Rd | Command::Wr | Command::Rda | Command::Wra) => {
                rules::bank_row_hit(node, child)
            }
            (level, _) => rules::scope_violation(Rule::RowHit, level, cmd),
        }
    }

    fn row_open(&self, node: &DramNode, cmd: Command, _child: usize) -> bool {
        match (node.level, cmd) {
            (Level::Bank, Command::Rd | Command::Wr | Command::Rda | Command::Wra) => {
                rules::bank_row_open(node)
            }
            (level, _) => rules::scope_violation(Rule::RowOpen, level, cmd),
        }
    }

    fn timing(&self, level: Level, cmd: Command) -> &[TimingEntry] {
        self.timing.get(level, cmd)
    }

    fn effect(&self, node: &mut DramNode, cmd: Command, child: usize) {
        use Command::*;
        match (node.level, cmd) {
            (Level::Rank, Prea) => rules::close_all_banks(node),
            (Level::Rank, Pde) => rules::enter_power_down(node),
            (Level::Rank, Pdx | Srx) => node.state = Some(State::PowerUp),
            (Level::Rank, Sre) => node.state = Some(State::SelfRefresh),
            (Level::Bank, Act) => rules::open_row(node, child),
            (Level::Bank, Pre | Rda | Wra) => rules::close_bank(node),
            (level, _) => rules::scope_violation(Rule::Effect, level, cmd),
        }
    }

    fn classify(&self, cmd: Command) -> Option<CommandClass> {
        use Command::*;
        match cmd {
            Act => Some(CommandClass::Opening),
            Rd | Wr | Rda | Wra => Some(CommandClass::Accessing),
            Pre | Prea => Some(CommandClass::Closing),
            Ref | Refsb | Pde | Pdx | Sre | Srx => None,
        }
    }

    fn is_refreshing(&self, _cmd: Command) -> bool {
        false
    }

    fn read_latency(&self) -> u64 {
        self.speed.n_cl + self.speed.n_bl
    }

    fn write_latency(&self) -> u64 {
        self.speed.n_wl + self.speed.n_bl
    }

    fn refresh_interval(&self) -> Option<u64> {
        None
    }

    fn clock_period_ns(&self) -> f64 {
        self.speed.t_ck
    }
}
