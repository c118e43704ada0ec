//! High Bandwidth Memory (HBM) command rules.
//!
//! Ranks model HBM pseudo channels. Each pseudo channel holds four bank
//! groups of four banks; refresh is all-bank (REF) or per-bank (REFSB).
//!
//! # Timing parameters (in clock cycles)
//!
//! * **BL**: burst length on the data bus.
//! * **CCD_S / CCD_L**: column-to-column delay, different / same bank group.
//! * **CL / CWL**: read / write latency.
//! * **RCDR / RCDW**: activate to read / write.
//! * **RP / RAS / RC**: precharge, activate-to-precharge, row cycle.
//! * **RRD_S / RRD_L / FAW**: activate spacing and the four-activate window.
//! * **RFC / REFI**: refresh cycle time and refresh interval.

use crate::common::{SimError, SimResult};
use crate::dram::node::DramNode;
use crate::dram::rules::{self, Command, CommandClass, CommandRules, Level, Rule, State, TimingEntry, TimingTable};

/// One HBM speed bin.
#[derive(Debug, Clone, Copy)]
pub struct HbmSpeed {
    pub name: &'static str,
    pub rate: u32,
    pub freq_mhz: f64,
    pub t_ck: f64,
    pub n_bl: u64,
    pub n_ccds: u64,
    pub n_ccdl: u64,
    pub n_cl: u64,
    pub n_rcdr: u64,
    pub n_rcdw: u64,
    pub n_rp: u64,
    pub n_cwl: u64,
    pub n_ras: u64,
    pub n_rc: u64,
    pub n_rtp: u64,
    pub n_wtrs: u64,
    pub n_wtrl: u64,
    pub n_wr: u64,
    pub n_rrds: u64,
    pub n_rrdl: u64,
    pub n_faw: u64,
    pub n_rfc: u64,
    pub n_rfcsb: u64,
    pub n_refi: u64,
    pub n_pd: u64,
    pub n_xp: u64,
    pub n_ckesr: u64,
    pub n_xs: u64,
}

/// 1 Gbps/pin, 500 MHz, 4 Gb per channel.
pub const HBM_1GBPS: HbmSpeed = HbmSpeed {
    name: "HBM_1Gbps",
    rate: 1000,
    freq_mhz: 500.0,
    t_ck: 2.0,
    n_bl: 2,
    n_ccds: 1,
    n_ccdl: 2,
    n_cl: 7,
    n_rcdr: 7,
    n_rcdw: 6,
    n_rp: 7,
    n_cwl: 4,
    n_ras: 17,
    n_rc: 24,
    n_rtp: 2,
    n_wtrs: 3,
    n_wtrl: 4,
    n_wr: 8,
    n_rrds: 2,
    n_rrdl: 3,
    n_faw: 15,
    n_rfc: 130,
    n_rfcsb: 80,
    n_refi: 1950,
    n_pd: 5,
    n_xp: 5,
    n_ckesr: 5,
    n_xs: 135,
};

const SPEEDS: &[HbmSpeed] = &[HBM_1GBPS];

/// HBM protocol rules for one speed bin.
pub struct Hbm {
    speed: HbmSpeed,
    timing: TimingTable,
}

impl Hbm {
    /// Looks up the speed bin by name and builds the timing table.
    pub fn new(speed: &str) -> SimResult<Self> {
        let speed = SPEEDS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(speed))
            .copied()
            .ok_or_else(|| SimError::UnknownSpeed {
                standard: "HBM".to_string(),
                speed: speed.to_string(),
            })?;
        Ok(Self::with_speed(speed))
    }

    pub fn with_speed(speed: HbmSpeed) -> Self {
        Self {
            timing: init_timing(&speed),
            speed,
        }
    }

    pub fn speed(&self) -> &HbmSpeed {
        &self.speed
    }
}

fn init_timing(s: &HbmSpeed) -> TimingTable {
    use Command::*;
    use Level::*;

    let rd = [Rd, Rda];
    let wr = [Wr, Wra];
    let everything = [Act, Pre, Prea, Rd, Rda, Wr, Wra, Ref, Refsb, Pde, Sre];
    let rda_to_act = s.n_rtp + s.n_rp;
    let wra_to_act = s.n_cwl + s.n_bl + s.n_wr + s.n_rp;
    let wr_to_pre = s.n_cwl + s.n_bl + s.n_wr;

    let mut t = TimingTable::new();

    // Data bus, shared by the pseudo channels.
    t.add_all(Channel, &rd, &rd, s.n_bl);
    t.add_all(Channel, &wr, &wr, s.n_bl);

    // Pseudo channel
    t.add_all(Rank, &rd, &rd, s.n_ccds);
    t.add_all(Rank, &wr, &wr, s.n_ccds);
    t.add_all(Rank, &rd, &wr, (s.n_cl + s.n_bl + 2).saturating_sub(s.n_cwl));
    t.add_all(Rank, &wr, &rd, s.n_cwl + s.n_bl + s.n_wtrs);
    t.add(Rank, Rd, Prea, s.n_rtp);
    t.add(Rank, Wr, Prea, wr_to_pre);
    t.add(Rank, Act, Act, s.n_rrds);
    t.add_dist(Rank, Act, Act, 4, s.n_faw);
    t.add(Rank, Act, Prea, s.n_ras);
    t.add(Rank, Prea, Act, s.n_rp);
    t.add(Rank, Rda, Act, rda_to_act);
    t.add(Rank, Wra, Act, wra_to_act);

    t.add(Rank, Act, Ref, s.n_rc);
    t.add(Rank, Pre, Ref, s.n_rp);
    t.add(Rank, Prea, Ref, s.n_rp);
    t.add(Rank, Rda, Ref, rda_to_act);
    t.add(Rank, Wra, Ref, wra_to_act);
    t.add_all(Rank, &[Ref], &[Act, Ref, Refsb, Pde, Sre], s.n_rfc);

    t.add_all(Rank, &rd, &[Pde], s.n_cl + s.n_bl + 1);
    t.add(Rank, Wr, Pde, wr_to_pre);
    t.add(Rank, Wra, Pde, wr_to_pre + 1);
    t.add_all(Rank, &[Act, Pre, Prea], &[Pde], 1);
    t.add(Rank, Pde, Pdx, s.n_pd);
    t.add_all(Rank, &[Pdx], &everything, s.n_xp);

    t.add(Rank, Act, Sre, s.n_rc);
    t.add_all(Rank, &[Pre, Prea], &[Sre], s.n_rp);
    t.add(Rank, Rda, Sre, rda_to_act);
    t.add(Rank, Wra, Sre, wra_to_act);
    t.add(Rank, Sre, Srx, s.n_ckesr);
    t.add_all(Rank, &[Srx], &everything, s.n_xs);

    t.add_all(BankGroup, &rd, &rd, s.n_ccdl);
    t.add_all(BankGroup, &wr, &wr, s.n_ccdl);
    t.add_all(BankGroup, &wr, &rd, s.n_cwl + s.n_bl + s.n_wtrl);
    t.add(BankGroup, Act, Act, s.n_rrdl);

    t.add(Bank, Act, Act, s.n_rc);
    t.add_all(Bank, &[Act], &rd, s.n_rcdr);
    t.add_all(Bank, &[Act], &wr, s.n_rcdw);
    t.add(Bank, Act, Pre, s.n_ras);
    t.add(Bank, Pre, Act, s.n_rp);
    t.add(Bank, Rd, Pre, s.n_rtp);
    t.add(Bank, Wr, Pre, wr_to_pre);
    t.add(Bank, Rda, Act, rda_to_act);
    t.add(Bank, Wra, Act, wra_to_act);

    t.add(Bank, Act, Refsb, s.n_rc);
    t.add(Bank, Pre, Refsb, s.n_rp);
    t.add(Bank, Rda, Refsb, rda_to_act);
    t.add(Bank, Wra, Refsb, wra_to_act);
    t.add_all(Bank, &[Refsb], &[Act, Refsb], s.n_rfcsb);
    // Other banks of the same bank group.
    t.add_sibling(Bank, Refsb, Act, s.n_rrdl);
    t.add_sibling(Bank, Act, Refsb, s.n_rrdl);

    t
}

impl CommandRules for Hbm {
    fn name(&self) -> &str {
        "HBM"
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
            Level::Channel | Level::BankGroup | Level::Column => None,
        }
    }

    fn has_rule(&self, rule: Rule, level: Level, cmd: Command) -> bool {
        use Command::*;
        match (rule, level) {
            (Rule::Prerequisite, Level::Rank) => {
                matches!(cmd, Act | Pre | Prea | Rd | Wr | Rda | Wra | Ref | Refsb | Pde | Sre)
            }
            (Rule::Prerequisite, Level::Bank) => matches!(cmd, Rd | Wr | Rda | Wra | Refsb),
            (Rule::RowHit, Level::Bank) | (Rule::RowOpen, Level::Bank) => {
                matches!(cmd, Rd | Wr | Rda | Wra)
            }
            (Rule::Effect, Level::Rank) => matches!(cmd, Prea | Ref | Pde | Pdx | Sre | Srx),
            (Rule::Effect, Level::Bank) => matches!(cmd, Act | Pre | Rda | Wra | Refsb),
            _ => false,
        }
    }

    fn prerequisite(&self, node: &DramNode, cmd: Command, child: usize) -> Option<Command> {
        use Command::*;
        match (node.level, cmd) {
            (Level::Rank, Act | Pre | Prea | Rd | Wr | Rda | Wra | Refsb) => rules::rank_wakeup(node),
            (Level::Rank, Ref) => rules::rank_refresh(node),
            (Level::Rank, Pde | Sre) => rules::rank_power_down(node, cmd),
            (Level::Bank, Rd | Wr | Rda | Wra) => rules::bank_access(node, cmd, child),
            (Level::Bank, Refsb) => rules::bank_refresh(node),
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
            (Level::Rank, Ref) => node.refresh_due = false,
            (Level::Rank, Pde) => rules::enter_power_down(node),
            (Level::Rank, Pdx | Srx) => node.state = Some(State::PowerUp),
            (Level::Rank, Sre) => node.state = Some(State::SelfRefresh),
            (Level::Bank, Act) => rules::open_row(node, child),
            (Level::Bank, Pre | Rda | Wra) => rules::close_bank(node),
            (Level::Bank, Refsb) => node.refresh_due = false,
            (level, _) => rules::scope_violation(Rule::Effect, level, cmd),
        }
    }

    fn classify(&self, cmd: Command) -> Option<CommandClass> {
        use Command::*;
        match cmd {
            Act => Some(CommandClass::Opening),
            Rd | Wr | Rda | Wra => Some(CommandClass::Accessing),
            Pre | Prea => Some(CommandClass::Closing),
            Ref | Refsb => Some(CommandClass::Refreshing),
            Pde | Pdx | Sre | Srx => None,
        }
    }

    fn read_latency(&self) -> u64 {
        self.speed.n_cl + self.speed.n_bl
    }

    fn write_latency(&self) -> u64 {
        self.speed.n_cwl + self.speed.n_bl
    }

    fn refresh_interval(&self) -> Option<u64> {
        Some(self.speed.n_refi).filter(|&n| n > 0)
    }

    fn clock_period_ns(&self) -> f64 {
        self.speed.t_ck
    }
}
