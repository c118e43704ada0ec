//! Device Hierarchy Nodes.
//!
//! Every channel, rank, bank group and bank is a [`DramNode`] holding its
//! current state and, per command, the cycles of its most recent commits.
//! Rows and columns are not materialized as nodes; a bank records its open
//! rows in `row_state`. All walks take the standard's [`CommandRules`] by
//! reference and follow a decoded [`AddrVec`] from the channel downwards.

use std::collections::{BTreeMap, VecDeque};

use crate::dram::rules::{AddrVec, Command, CommandRules, Level, Rule, State};

/// One node of the device hierarchy.
#[derive(Debug, Clone)]
pub struct DramNode {
    pub level: Level,
    pub id: usize,
    /// Current lifecycle state, `None` for stateless levels.
    pub state: Option<State>,
    /// Open rows, kept at bank level.
    pub row_state: BTreeMap<usize, State>,
    /// Set by the controller's refresh timer, cleared by REF/REFSB.
    pub refresh_due: bool,
    pub children: Vec<DramNode>,
    /// Last commit cycles per command, most recent first.
    prev: Vec<VecDeque<Option<u64>>>,
    /// Earliest cycle each command may commit at.
    next: [u64; Command::COUNT],
}

impl DramNode {
    /// Builds the subtree rooted at `level`.
    ///
    /// # Arguments
    ///
    /// * `rules` - Standard whose start states and timing depths apply.
    /// * `level` - Level of the new node.
    /// * `id` - Index of the node among its siblings.
    /// * `fanout` - Children per node, indexed by level; levels from `Row`
    ///   down are not materialized.
    pub fn new(rules: &dyn CommandRules, level: Level, id: usize, fanout: &[usize; Level::COUNT]) -> Self {
        let prev = Command::ALL
            .iter()
            .map(|&cmd| VecDeque::from(vec![None; history_depth(rules, level, cmd)]))
            .collect();

        let children = match level.child() {
            Some(child) if child < Level::Row => (0..fanout[child.index()].max(1))
                .map(|i| DramNode::new(rules, child, i, fanout))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            level,
            id,
            state: rules.start_state(level),
            row_state: BTreeMap::new(),
            refresh_due: false,
            children,
            prev,
            next: [0; Command::COUNT],
        }
    }

    /// Iterates over every bank below this node (or the node itself if it is one).
    pub fn banks(&self) -> Box<dyn Iterator<Item = &DramNode> + '_> {
        if self.level == Level::Bank {
            Box::new(std::iter::once(self))
        } else {
            Box::new(self.children.iter().flat_map(|c| c.banks()))
        }
    }

    pub fn banks_mut(&mut self) -> Box<dyn Iterator<Item = &mut DramNode> + '_> {
        if self.level == Level::Bank {
            Box::new(std::iter::once(self))
        } else {
            Box::new(self.children.iter_mut().flat_map(|c| c.banks_mut()))
        }
    }

    /// The node at `level` on the path selected by `addr`.
    pub fn node_at(&self, level: Level, addr: &AddrVec) -> Option<&DramNode> {
        if self.level == level {
            return Some(self);
        }
        let child = self.level.child()?;
        self.children.get(addr[child.index()])?.node_at(level, addr)
    }

    pub fn node_at_mut(&mut self, level: Level, addr: &AddrVec) -> Option<&mut DramNode> {
        if self.level == level {
            return Some(self);
        }
        let child = self.level.child()?;
        self.children.get_mut(addr[child.index()])?.node_at_mut(level, addr)
    }

    fn child_id(&self, addr: &AddrVec) -> Option<usize> {
        self.level.child().map(|l| addr[l.index()])
    }

    /// Resolves `cmd` to the command that has to issue first on the path.
    ///
    /// Returns `cmd` itself when nothing stands in the way.
    pub fn decode(&self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec) -> Command {
        let child_id = self.child_id(addr);
        if rules.has_rule(Rule::Prerequisite, self.level, cmd) {
            if let Some(pre) = rules.prerequisite(self, cmd, child_id.unwrap_or(0)) {
                return pre;
            }
        }
        match child_id.and_then(|id| self.children.get(id)) {
            Some(child) => child.decode(rules, cmd, addr),
            None => cmd,
        }
    }

    /// Whether `cmd` satisfies every timing constraint on the path at `clk`.
    pub fn check(&self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec, clk: u64) -> bool {
        if clk < self.next[cmd.index()] {
            return false;
        }
        if self.level == rules.scope(cmd) {
            return true;
        }
        match self.child_id(addr).and_then(|id| self.children.get(id)) {
            Some(child) => child.check(rules, cmd, addr, clk),
            None => true,
        }
    }

    /// Earliest cycle at which `cmd` becomes legal on the path.
    pub fn next_ready(&self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec) -> u64 {
        let here = self.next[cmd.index()];
        if self.level == rules.scope(cmd) {
            return here;
        }
        match self.child_id(addr).and_then(|id| self.children.get(id)) {
            Some(child) => here.max(child.next_ready(rules, cmd, addr)),
            None => here,
        }
    }

    pub fn row_hit(&self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec) -> bool {
        let child_id = self.child_id(addr);
        if rules.has_rule(Rule::RowHit, self.level, cmd) {
            return rules.row_hit(self, cmd, child_id.unwrap_or(0));
        }
        match child_id.and_then(|id| self.children.get(id)) {
            Some(child) => child.row_hit(rules, cmd, addr),
            None => false,
        }
    }

    pub fn row_open(&self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec) -> bool {
        let child_id = self.child_id(addr);
        if rules.has_rule(Rule::RowOpen, self.level, cmd) {
            return rules.row_open(self, cmd, child_id.unwrap_or(0));
        }
        match child_id.and_then(|id| self.children.get(id)) {
            Some(child) => child.row_open(rules, cmd, addr),
            None => false,
        }
    }

    /// Commits `cmd` at `clk`: applies its effects, then its timing.
    pub fn update(&mut self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec, clk: u64) {
        self.update_state(rules, cmd, addr);
        self.update_timing(rules, cmd, addr, clk);
    }

    fn update_state(&mut self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec) {
        let child_id = self.child_id(addr);
        if rules.has_rule(Rule::Effect, self.level, cmd) {
            rules.effect(self, cmd, child_id.unwrap_or(0));
        }
        if self.level == rules.scope(cmd) {
            return;
        }
        if let Some(child) = child_id.and_then(|id| self.children.get_mut(id)) {
            child.update_state(rules, cmd, addr);
        }
    }

    fn update_timing(&mut self, rules: &dyn CommandRules, cmd: Command, addr: &AddrVec, clk: u64) {
        if self.id != addr[self.level.index()] {
            for t in rules.timing(self.level, cmd).iter().filter(|t| t.sibling) {
                self.bump(t.next, clk + t.val);
            }
            return;
        }

        let history = &mut self.prev[cmd.index()];
        if !history.is_empty() {
            history.pop_back();
            history.push_front(Some(clk));
        }

        for t in rules.timing(self.level, cmd).iter().filter(|t| !t.sibling) {
            if let Some(past) = self.prev[cmd.index()].get(t.dist - 1).copied().flatten() {
                self.bump(t.next, past + t.val);
            }
        }

        for child in &mut self.children {
            child.update_timing(rules, cmd, addr, clk);
        }
    }

    fn bump(&mut self, cmd: Command, at: u64) {
        let slot = &mut self.next[cmd.index()];
        *slot = (*slot).max(at);
    }
}

/// Depth of per-command commit history a node at `level` needs.
fn history_depth(rules: &dyn CommandRules, level: Level, cmd: Command) -> usize {
    rules
        .timing(level, cmd)
        .iter()
        .filter(|t| !t.sibling)
        .map(|t| t.dist)
        .max()
        .unwrap_or(0)
}
