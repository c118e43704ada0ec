//! Integration tests for memory standard rules and the node state machine.

use dram_sim::common::{RequestType, SimError};
use dram_sim::config::MappingConfig;
use dram_sim::dram::{self, AddrVec, Command, CommandClass, CommandRules, DramNode, Hbm, Level, Nvm, Rule, State};
use dram_sim::sim::AddressMapping;

fn hbm() -> Hbm {
    Hbm::new("HBM_1Gbps").expect("HBM_1Gbps is registered")
}

/// Creates channel 0 of the default layout.
fn channel(rules: &dyn CommandRules) -> DramNode {
    let mapping = AddressMapping::new(&MappingConfig::default()).unwrap();
    DramNode::new(rules, Level::Channel, 0, &mapping.fanout())
}

fn addr(rank: usize, bg: usize, bank: usize, row: usize) -> AddrVec {
    [0, rank, bg, bank, row, 0]
}

fn bank<'a>(node: &'a DramNode, a: &AddrVec) -> &'a DramNode {
    node.node_at(Level::Bank, a).expect("bank exists")
}

/// Tests the materialized hierarchy and start states.
#[test]
fn test_node_tree_shape() {
    let rules = hbm();
    let ch = channel(&rules);

    assert_eq!(ch.children.len(), 2);
    assert_eq!(ch.children[0].children.len(), 4);
    assert_eq!(ch.banks().count(), 2 * 4 * 4);
    assert_eq!(ch.state, None);
    assert_eq!(ch.children[1].state, Some(State::PowerUp));
    assert!(ch.banks().all(|b| b.state == Some(State::Closed)));
    assert!(ch.banks().all(|b| b.children.is_empty()));
}

/// Tests that a read to a closed bank needs an activate first.
#[test]
fn test_closed_bank_needs_activate() {
    let rules = hbm();
    let ch = channel(&rules);
    let a = addr(0, 1, 2, 100);

    assert_eq!(ch.decode(&rules, Command::Rd, &a), Command::Act);
    assert!(ch.check(&rules, Command::Act, &a, 0));
    assert!(!ch.row_hit(&rules, Command::Rd, &a));
    assert!(!ch.row_open(&rules, Command::Rd, &a));
}

/// Tests row hit, activate-to-read delay and row conflict.
#[test]
fn test_open_row_hit_and_conflict() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(0, 1, 2, 100);

    ch.update(&rules, Command::Act, &a, 0);
    assert_eq!(bank(&ch, &a).state, Some(State::Opened));
    assert!(bank(&ch, &a).row_state.contains_key(&100));

    assert_eq!(ch.decode(&rules, Command::Rd, &a), Command::Rd);
    assert!(ch.row_hit(&rules, Command::Rd, &a));
    assert!(!ch.check(&rules, Command::Rd, &a, 6));
    assert!(ch.check(&rules, Command::Rd, &a, 7));
    assert_eq!(ch.next_ready(&rules, Command::Wr, &a), 6);

    let other = addr(0, 1, 2, 101);
    assert_eq!(ch.decode(&rules, Command::Rd, &other), Command::Pre);
    assert!(!ch.row_hit(&rules, Command::Rd, &other));
    assert!(ch.row_open(&rules, Command::Rd, &other));
    assert!(!ch.check(&rules, Command::Pre, &other, 16));
    assert_eq!(ch.next_ready(&rules, Command::Pre, &other), 17);

    ch.update(&rules, Command::Pre, &other, 17);
    assert_eq!(bank(&ch, &a).state, Some(State::Closed));
    assert!(bank(&ch, &a).row_state.is_empty());
    assert_eq!(ch.decode(&rules, Command::Rd, &other), Command::Act);
    assert_eq!(ch.next_ready(&rules, Command::Act, &other), 24);
}

/// Tests that auto-precharge accesses close the bank.
#[test]
fn test_auto_precharge_closes_bank() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(1, 0, 3, 9);

    ch.update(&rules, Command::Act, &a, 0);
    assert_eq!(ch.decode(&rules, Command::Rda, &a), Command::Rda);
    ch.update(&rules, Command::Rda, &a, 7);

    assert_eq!(bank(&ch, &a).state, Some(State::Closed));
    // RDA to ACT is tRTP + tRP after the access; tRC from the first ACT is later.
    assert_eq!(ch.next_ready(&rules, Command::Act, &a), 24);
}

/// Tests that all-bank refresh precharges open banks first.
#[test]
fn test_refresh_requires_closed_banks() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(0, 2, 1, 5);
    let rank = addr(0, 0, 0, 0);

    assert_eq!(ch.decode(&rules, Command::Ref, &rank), Command::Ref);

    ch.update(&rules, Command::Act, &a, 0);
    assert_eq!(ch.decode(&rules, Command::Ref, &rank), Command::Prea);
    assert!(!ch.check(&rules, Command::Prea, &rank, 16));
    assert!(ch.check(&rules, Command::Prea, &rank, 17));

    ch.update(&rules, Command::Prea, &rank, 17);
    assert!(ch.banks().all(|b| b.state == Some(State::Closed)));
    assert_eq!(ch.decode(&rules, Command::Ref, &rank), Command::Ref);
    assert!(!ch.check(&rules, Command::Ref, &rank, 23));
    assert!(ch.check(&rules, Command::Ref, &rank, 24));

    ch.children[0].refresh_due = true;
    ch.update(&rules, Command::Ref, &rank, 24);
    assert!(!ch.children[0].refresh_due);
    assert_eq!(ch.next_ready(&rules, Command::Act, &a), 24 + 130);
}

/// Tests the four-activate window measured four commits back.
#[test]
fn test_four_activate_window() {
    let rules = hbm();
    let mut ch = channel(&rules);

    for (i, clk) in [0u64, 2, 4, 6].into_iter().enumerate() {
        let a = addr(0, i, 0, 1);
        assert!(ch.check(&rules, Command::Act, &a, clk), "ACT {} at {}", i, clk);
        ch.update(&rules, Command::Act, &a, clk);
    }

    let fifth = addr(0, 0, 1, 1);
    assert_eq!(ch.next_ready(&rules, Command::Act, &fifth), 15);
    assert!(!ch.check(&rules, Command::Act, &fifth, 14));
    assert!(ch.check(&rules, Command::Act, &fifth, 15));

    // The other pseudo channel keeps its own window.
    assert_eq!(ch.next_ready(&rules, Command::Act, &addr(1, 0, 0, 1)), 0);
}

/// Tests per-bank refresh and its sibling constraints within a bank group.
#[test]
fn test_per_bank_refresh_siblings() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let target = addr(0, 0, 0, 0);

    assert_eq!(ch.decode(&rules, Command::Refsb, &target), Command::Refsb);
    ch.update(&rules, Command::Refsb, &target, 0);

    assert_eq!(ch.next_ready(&rules, Command::Act, &target), 80);
    assert_eq!(ch.next_ready(&rules, Command::Act, &addr(0, 0, 1, 0)), 3);
    assert_eq!(ch.next_ready(&rules, Command::Act, &addr(0, 0, 3, 0)), 3);
    assert_eq!(ch.next_ready(&rules, Command::Act, &addr(0, 1, 0, 0)), 0);
}

/// Tests that a per-bank refresh of an open bank precharges it first.
#[test]
fn test_per_bank_refresh_open_bank() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let target = addr(1, 3, 2, 40);

    ch.update(&rules, Command::Act, &target, 0);
    assert_eq!(ch.decode(&rules, Command::Refsb, &target), Command::Pre);
    assert_eq!(ch.next_ready(&rules, Command::Refsb, &addr(1, 3, 1, 0)), 3);
}

/// Tests power-down entry and exit.
#[test]
fn test_power_down_cycle() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(0, 0, 0, 7);

    assert_eq!(ch.decode(&rules, Command::Pde, &a), Command::Pde);
    ch.update(&rules, Command::Pde, &a, 0);
    assert_eq!(ch.children[0].state, Some(State::PrecPowerDown));

    assert_eq!(ch.decode(&rules, Command::Rd, &a), Command::Pdx);
    assert_eq!(ch.decode(&rules, Command::Sre, &a), Command::Pdx);
    assert!(!ch.check(&rules, Command::Pdx, &a, 4));
    assert!(ch.check(&rules, Command::Pdx, &a, 5));

    ch.update(&rules, Command::Pdx, &a, 5);
    assert_eq!(ch.children[0].state, Some(State::PowerUp));
    assert_eq!(ch.next_ready(&rules, Command::Act, &a), 10);
    assert_eq!(ch.decode(&rules, Command::Rd, &a), Command::Act);
}

/// Tests that power-down with an open bank is active power-down.
#[test]
fn test_active_power_down() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(0, 0, 0, 7);

    ch.update(&rules, Command::Act, &a, 0);
    assert!(ch.check(&rules, Command::Pde, &a, 1));
    ch.update(&rules, Command::Pde, &a, 1);

    assert_eq!(ch.children[0].state, Some(State::ActivePowerDown));
    assert_eq!(bank(&ch, &a).state, Some(State::Opened));
}

/// Tests self-refresh entry and the exits it requires.
#[test]
fn test_self_refresh() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(1, 0, 0, 0);

    ch.update(&rules, Command::Sre, &a, 0);
    assert_eq!(ch.children[1].state, Some(State::SelfRefresh));
    assert_eq!(ch.children[0].state, Some(State::PowerUp));

    assert_eq!(ch.decode(&rules, Command::Act, &a), Command::Srx);
    assert_eq!(ch.decode(&rules, Command::Pde, &a), Command::Srx);
    assert_eq!(ch.next_ready(&rules, Command::Srx, &a), 5);

    ch.update(&rules, Command::Srx, &a, 5);
    assert_eq!(ch.children[1].state, Some(State::PowerUp));
    assert_eq!(ch.next_ready(&rules, Command::Act, &a), 5 + 135);
}

/// Tests that a data burst on one pseudo channel delays the other.
#[test]
fn test_shared_data_bus() {
    let rules = hbm();
    let mut ch = channel(&rules);
    let a = addr(0, 0, 0, 1);
    let b = addr(1, 0, 0, 1);

    ch.update(&rules, Command::Act, &a, 0);
    ch.update(&rules, Command::Act, &b, 0);
    ch.update(&rules, Command::Rd, &a, 7);

    assert!(!ch.check(&rules, Command::Rd, &b, 8));
    assert!(ch.check(&rules, Command::Rd, &b, 9));
}

/// Tests that calling a rule outside its declared scope aborts.
#[test]
#[should_panic]
fn test_prerequisite_scope_violation() {
    let rules = hbm();
    let ch = channel(&rules);
    assert!(!rules.has_rule(Rule::Prerequisite, Level::Channel, Command::Rd));
    let _ = rules.prerequisite(&ch, Command::Rd, 0);
}

/// Tests that applying an undeclared effect aborts.
#[test]
#[should_panic]
fn test_effect_scope_violation() {
    let rules = hbm();
    let mut ch = channel(&rules);
    rules.effect(&mut ch, Command::Act, 0);
}

/// Tests command scopes and classification of the HBM standard.
#[test]
fn test_hbm_scopes_and_classes() {
    let rules = hbm();

    assert_eq!(rules.scope(Command::Act), Level::Row);
    assert_eq!(rules.scope(Command::Pre), Level::Bank);
    assert_eq!(rules.scope(Command::Rd), Level::Column);
    assert_eq!(rules.scope(Command::Ref), Level::Rank);
    assert_eq!(rules.classify(Command::Act), Some(CommandClass::Opening));
    assert_eq!(rules.classify(Command::Refsb), Some(CommandClass::Refreshing));
    assert_eq!(rules.classify(Command::Pde), None);
    assert!(rules.is_closing(Command::Wra));
    assert!(rules.is_accessing(Command::Wra));
    assert!(rules.is_refreshing(Command::Ref));
    assert_eq!(rules.translate(RequestType::Write), Command::Wr);
    assert_eq!(rules.read_latency(), 9);
    assert_eq!(rules.write_latency(), 6);
    assert_eq!(rules.refresh_interval(), Some(1950));
    assert_eq!(rules.clock_period_ns(), 2.0);
}

/// Tests the NVM standard: no refresh, long activation.
#[test]
fn test_nvm_rules() {
    let rules = Nvm::new("nvm_1gbps").unwrap();
    let mut ch = channel(&rules);
    let a = addr(0, 0, 0, 3);

    assert_eq!(rules.name(), "NVM");
    assert_eq!(rules.refresh_interval(), None);
    assert!(!rules.is_refreshing(Command::Ref));
    assert!(!rules.has_rule(Rule::Prerequisite, Level::Rank, Command::Ref));
    assert!(!rules.has_rule(Rule::Effect, Level::Bank, Command::Refsb));
    assert_eq!(rules.read_latency(), 9);
    assert_eq!(rules.write_latency(), 4);

    assert_eq!(ch.decode(&rules, Command::Wr, &a), Command::Act);
    ch.update(&rules, Command::Act, &a, 0);
    assert_eq!(ch.next_ready(&rules, Command::Wr, &a), 25);
}

/// Tests the standard registry.
#[test]
fn test_standard_registry() {
    let rules = dram::standard("hbm", "HBM_1Gbps").unwrap();
    assert_eq!(rules.name(), "HBM");
    assert_eq!(rules.speed_name(), "HBM_1Gbps");

    let nvm = dram::standard("NVM", "NVM_1Gbps").unwrap();
    assert_eq!(nvm.name(), "NVM");

    assert!(matches!(
        dram::standard("DDR9", "DDR9_1Gbps"),
        Err(SimError::UnknownStandard(name)) if name == "DDR9"
    ));
    assert!(matches!(
        dram::standard("HBM", "HBM_9Gbps"),
        Err(SimError::UnknownSpeed { .. })
    ));
}
