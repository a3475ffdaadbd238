// 🔗 Matcher - Link model elements to budget items
// Four strategies, strict priority: Global Id → Tag → Name → Description
//
// Each strategy only sees records left unconsumed by the ones before it.
// Whatever is left afterwards becomes MODEL_ONLY / BUDGET_ONLY.

use crate::config::MatcherConfig;
use crate::error::{ReconError, ReconResult};
use crate::records::{check_unique_budget_codes, check_unique_model_ids, BudgetItem, ModelElement};
use crate::similarity::PreparedText;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info};

// ============================================================================
// MATCH STATUS / METHOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Both sides present
    Matched,

    /// Model element with no budget line
    ModelOnly,

    /// Budget line with no model element
    BudgetOnly,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Matched => "MATCHED",
            MatchStatus::ModelOnly => "MODEL_ONLY",
            MatchStatus::BudgetOnly => "BUDGET_ONLY",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    /// linkedGlobalId == globalId (confidence 1.0)
    GlobalId,

    /// code == tag (confidence 1.0)
    Tag,

    /// Normalized name equality or token containment
    Name,

    /// Jaccard word overlap (confidence 0.5 - 0.8)
    Description,

    /// Unmatched record
    None,
}

impl MatchMethod {
    pub fn all() -> [MatchMethod; 5] {
        [
            MatchMethod::GlobalId,
            MatchMethod::Tag,
            MatchMethod::Name,
            MatchMethod::Description,
            MatchMethod::None,
        ]
    }

    /// GLOBAL_ID and TAG link by identifier; NAME and DESCRIPTION are fuzzy.
    pub fn is_exact_identifier(&self) -> bool {
        matches!(self, MatchMethod::GlobalId | MatchMethod::Tag)
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchMethod::GlobalId => "GLOBAL_ID",
            MatchMethod::Tag => "TAG",
            MatchMethod::Name => "NAME",
            MatchMethod::Description => "DESCRIPTION",
            MatchMethod::None => "NONE",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// MATCHED PAIR
// ============================================================================

/// One output row of the matcher. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair<'a> {
    status: MatchStatus,
    method: MatchMethod,
    model: Option<&'a ModelElement>,
    budget: Option<&'a BudgetItem>,
    confidence: f64,
}

impl<'a> MatchedPair<'a> {
    /// Build a pair, rejecting shapes that break the pair contract.
    pub fn new(
        status: MatchStatus,
        method: MatchMethod,
        model: Option<&'a ModelElement>,
        budget: Option<&'a BudgetItem>,
        confidence: f64,
    ) -> ReconResult<Self> {
        check_pair_shape(status, method, model.is_some(), budget.is_some())?;

        if !(0.0..=1.0).contains(&confidence) {
            return Err(ReconError::ConfidenceOutOfRange(confidence));
        }

        Ok(MatchedPair {
            status,
            method,
            model,
            budget,
            confidence,
        })
    }

    pub fn matched(
        model: &'a ModelElement,
        budget: &'a BudgetItem,
        method: MatchMethod,
        confidence: f64,
    ) -> ReconResult<Self> {
        Self::new(MatchStatus::Matched, method, Some(model), Some(budget), confidence)
    }

    pub fn model_only(model: &'a ModelElement) -> Self {
        MatchedPair {
            status: MatchStatus::ModelOnly,
            method: MatchMethod::None,
            model: Some(model),
            budget: None,
            confidence: 0.0,
        }
    }

    pub fn budget_only(budget: &'a BudgetItem) -> Self {
        MatchedPair {
            status: MatchStatus::BudgetOnly,
            method: MatchMethod::None,
            model: None,
            budget: Some(budget),
            confidence: 0.0,
        }
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    pub fn model(&self) -> Option<&'a ModelElement> {
        self.model
    }

    pub fn budget(&self) -> Option<&'a BudgetItem> {
        self.budget
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_matched(&self) -> bool {
        self.status == MatchStatus::Matched
    }

    /// Subject code: budget code, then model tag, then global id.
    pub fn code(&self) -> Option<&'a str> {
        self.budget
            .and_then(|b| b.code())
            .or_else(|| self.model.and_then(|m| m.tag()))
            .or_else(|| self.model.and_then(|m| m.global_id()))
    }

    /// Subject name: budget description, then model name, then "Unknown".
    pub fn name(&self) -> &'a str {
        self.budget
            .and_then(|b| b.description())
            .or_else(|| {
                self.model
                    .map(|m| m.display_name())
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or("Unknown")
    }

    /// Destructure into the populated sides, failing on a malformed pair.
    pub fn sides(&self) -> ReconResult<PairSides<'a>> {
        match (self.status, self.model, self.budget) {
            (MatchStatus::Matched, Some(m), Some(b)) => Ok(PairSides::Matched(m, b)),
            (MatchStatus::ModelOnly, Some(m), None) => Ok(PairSides::ModelOnly(m)),
            (MatchStatus::BudgetOnly, None, Some(b)) => Ok(PairSides::BudgetOnly(b)),
            (status, m, b) => Err(shape_error(status, m.is_some(), b.is_some())),
        }
    }
}

/// Populated sides of a pair, by status.
#[derive(Debug, Clone, Copy)]
pub enum PairSides<'a> {
    Matched(&'a ModelElement, &'a BudgetItem),
    ModelOnly(&'a ModelElement),
    BudgetOnly(&'a BudgetItem),
}

fn check_pair_shape(
    status: MatchStatus,
    method: MatchMethod,
    has_model: bool,
    has_budget: bool,
) -> ReconResult<()> {
    let consistent = match status {
        MatchStatus::Matched => has_model && has_budget && method != MatchMethod::None,
        MatchStatus::ModelOnly => has_model && !has_budget && method == MatchMethod::None,
        MatchStatus::BudgetOnly => !has_model && has_budget && method == MatchMethod::None,
    };

    if consistent {
        Ok(())
    } else {
        Err(shape_error(status, has_model, has_budget))
    }
}

fn shape_error(status: MatchStatus, has_model: bool, has_budget: bool) -> ReconError {
    if !has_model && !has_budget {
        ReconError::EmptyPair
    } else {
        ReconError::InconsistentPair {
            status: status.to_string(),
            has_model,
            has_budget,
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

/// Partition of the inputs into matched, model-only and budget-only pairs.
///
/// Pair order: GLOBAL_ID, TAG, NAME, DESCRIPTION matches, then MODEL_ONLY
/// in model input order, then BUDGET_ONLY in budget input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult<'a> {
    pairs: Vec<MatchedPair<'a>>,

    /// Elements removed by the ignore filter (never paired)
    ignored: Vec<&'a ModelElement>,

    /// Model elements that took part in matching (ignored excluded)
    total_model: usize,

    total_budget: usize,
}

impl<'a> MatchResult<'a> {
    /// Assemble a result from pre-built pairs (e.g. from another linker).
    ///
    /// Totals are derived from the pairs.
    pub fn from_pairs(pairs: Vec<MatchedPair<'a>>) -> Self {
        let total_model = pairs.iter().filter(|p| p.model.is_some()).count();
        let total_budget = pairs.iter().filter(|p| p.budget.is_some()).count();

        MatchResult {
            pairs,
            ignored: Vec::new(),
            total_model,
            total_budget,
        }
    }

    pub fn pairs(&self) -> &[MatchedPair<'a>] {
        &self.pairs
    }

    pub fn ignored(&self) -> &[&'a ModelElement] {
        &self.ignored
    }

    pub fn total_model(&self) -> usize {
        self.total_model
    }

    pub fn total_budget(&self) -> usize {
        self.total_budget
    }

    pub fn matched(&self) -> impl Iterator<Item = &MatchedPair<'a>> + '_ {
        self.with_status(MatchStatus::Matched)
    }

    pub fn model_only(&self) -> impl Iterator<Item = &MatchedPair<'a>> + '_ {
        self.with_status(MatchStatus::ModelOnly)
    }

    pub fn budget_only(&self) -> impl Iterator<Item = &MatchedPair<'a>> + '_ {
        self.with_status(MatchStatus::BudgetOnly)
    }

    pub fn match_count(&self) -> usize {
        self.matched().count()
    }

    /// Matched pairs linked by `method`
    pub fn by_method(&self, method: MatchMethod) -> Vec<&MatchedPair<'a>> {
        self.matched().filter(|p| p.method == method).collect()
    }

    /// Matched pairs with confidence >= threshold
    pub fn high_confidence(&self, threshold: f64) -> Vec<&MatchedPair<'a>> {
        self.matched().filter(|p| p.confidence >= threshold).collect()
    }

    /// Percentage of records covered by a match (each match covers two).
    pub fn match_rate(&self) -> f64 {
        let total = self.total_model + self.total_budget;
        if total == 0 {
            return 0.0;
        }
        (self.match_count() * 2) as f64 / total as f64 * 100.0
    }

    pub fn summary(&self) -> MatchSummary {
        let mut by_method = BTreeMap::new();
        for pair in self.matched() {
            *by_method.entry(pair.method).or_insert(0) += 1;
        }

        MatchSummary {
            total_model: self.total_model,
            total_budget: self.total_budget,
            matched: self.match_count(),
            model_only: self.model_only().count(),
            budget_only: self.budget_only().count(),
            ignored: self.ignored.len(),
            by_method,
            match_rate: self.match_rate(),
        }
    }

    fn with_status(&self, status: MatchStatus) -> impl Iterator<Item = &MatchedPair<'a>> + '_ {
        self.pairs.iter().filter(move |p| p.status == status)
    }
}

/// Owned statistics snapshot for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub total_model: usize,
    pub total_budget: usize,
    pub matched: usize,
    pub model_only: usize,
    pub budget_only: usize,
    pub ignored: usize,

    /// Matched pairs per method
    pub by_method: BTreeMap<MatchMethod, usize>,

    /// Percent (0 - 100)
    pub match_rate: f64,
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched, {} model-only, {} budget-only, {} ignored ({:.1}%)",
            self.matched, self.model_only, self.budget_only, self.ignored, self.match_rate
        )
    }
}

// ============================================================================
// MATCHER
// ============================================================================

type IgnorePredicate = Box<dyn Fn(&ModelElement) -> bool + Send + Sync>;

pub struct Matcher {
    config: MatcherConfig,

    /// Caller-supplied ignore rule, OR-ed with `config.ignore`
    ignore_predicate: Option<IgnorePredicate>,
}

impl Matcher {
    /// Create a matcher; the configuration is validated here.
    pub fn new(config: MatcherConfig) -> ReconResult<Self> {
        config.validate()?;
        Ok(Matcher {
            config,
            ignore_predicate: None,
        })
    }

    /// Builder: exclude elements for which `predicate` returns true
    pub fn with_ignore_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ModelElement) -> bool + Send + Sync + 'static,
    {
        self.ignore_predicate = Some(Box::new(predicate));
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Run the cascade over both collections.
    ///
    /// Fails only on duplicate global ids or budget codes.
    pub fn match_records<'a>(
        &self,
        models: &'a [ModelElement],
        budget: &'a [BudgetItem],
    ) -> ReconResult<MatchResult<'a>> {
        check_unique_model_ids(models)?;
        check_unique_budget_codes(budget)?;

        let (candidates, ignored): (Vec<&ModelElement>, Vec<&ModelElement>) =
            models.iter().partition(|m| !self.is_ignored(m));
        if !ignored.is_empty() {
            debug!("Ignored {} non-comparable model elements", ignored.len());
        }

        let mut set = WorkingSet::new(candidates, budget);

        if self.config.use_global_id {
            let n = match_by_global_id(&mut set)?;
            debug!("GLOBAL_ID strategy: {} matches", n);
        }
        if self.config.use_tag {
            let n = match_by_tag(&mut set)?;
            debug!("TAG strategy: {} matches", n);
        }
        if self.config.use_name {
            let n = match_by_name(&mut set, self.config.min_confidence)?;
            debug!("NAME strategy: {} matches", n);
        }
        if self.config.use_description {
            let n = match_by_description(&mut set, self.config.description_floor)?;
            debug!("DESCRIPTION strategy: {} matches", n);
        }

        let result = set.finish(ignored);
        info!("Matching complete: {}", result.summary());
        Ok(result)
    }

    fn is_ignored(&self, element: &ModelElement) -> bool {
        let by_filter = self
            .config
            .ignore
            .as_ref()
            .map_or(false, |f| f.matches_element(element));
        let by_predicate = self.ignore_predicate.as_ref().map_or(false, |p| p(element));
        by_filter || by_predicate
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher {
            config: MatcherConfig::default(),
            ignore_predicate: None,
        }
    }
}

/// One-shot entry point: validate `config`, then match.
pub fn match_records<'a>(
    models: &'a [ModelElement],
    budget: &'a [BudgetItem],
    config: &MatcherConfig,
) -> ReconResult<MatchResult<'a>> {
    Matcher::new(config.clone())?.match_records(models, budget)
}

// ============================================================================
// WORKING SET
// ============================================================================

/// Residual unmatched records, addressed by index into each side.
struct WorkingSet<'a> {
    models: Vec<&'a ModelElement>,
    budget: &'a [BudgetItem],
    model_used: Vec<bool>,
    budget_used: Vec<bool>,
    pairs: Vec<MatchedPair<'a>>,
}

impl<'a> WorkingSet<'a> {
    fn new(models: Vec<&'a ModelElement>, budget: &'a [BudgetItem]) -> Self {
        WorkingSet {
            model_used: vec![false; models.len()],
            budget_used: vec![false; budget.len()],
            models,
            budget,
            pairs: Vec::new(),
        }
    }

    fn consume(
        &mut self,
        model_idx: usize,
        budget_idx: usize,
        method: MatchMethod,
        confidence: f64,
    ) -> ReconResult<()> {
        let budget: &'a [BudgetItem] = self.budget;
        let pair = MatchedPair::matched(self.models[model_idx], &budget[budget_idx], method, confidence)?;
        self.model_used[model_idx] = true;
        self.budget_used[budget_idx] = true;
        self.pairs.push(pair);
        Ok(())
    }

    fn remaining_models(&self) -> Vec<usize> {
        (0..self.models.len()).filter(|&i| !self.model_used[i]).collect()
    }

    fn remaining_budget(&self) -> Vec<usize> {
        (0..self.budget.len()).filter(|&j| !self.budget_used[j]).collect()
    }

    fn finish(mut self, ignored: Vec<&'a ModelElement>) -> MatchResult<'a> {
        let budget: &'a [BudgetItem] = self.budget;
        for i in self.remaining_models() {
            self.pairs.push(MatchedPair::model_only(self.models[i]));
        }
        for j in self.remaining_budget() {
            self.pairs.push(MatchedPair::budget_only(&budget[j]));
        }

        MatchResult {
            pairs: self.pairs,
            ignored,
            total_model: self.models.len(),
            total_budget: self.budget.len(),
        }
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// Strategy 1: budget linkedGlobalId ↔ model globalId
fn match_by_global_id<'a>(set: &mut WorkingSet<'a>) -> ReconResult<usize> {
    let models: Vec<&'a ModelElement> = set.models.clone();
    let budget: &'a [BudgetItem] = set.budget;

    let index: HashMap<&'a str, usize> = set
        .remaining_models()
        .into_iter()
        .filter_map(|i| models[i].global_id().map(|id| (id, i)))
        .collect();

    let mut count = 0;
    for j in set.remaining_budget() {
        let Some(linked) = budget[j].linked_global_id() else {
            continue;
        };
        if let Some(&i) = index.get(linked) {
            if !set.model_used[i] {
                set.consume(i, j, MatchMethod::GlobalId, 1.0)?;
                count += 1;
            }
        }
    }

    Ok(count)
}

/// Strategy 2: budget code ↔ model tag (first unconsumed element wins)
fn match_by_tag<'a>(set: &mut WorkingSet<'a>) -> ReconResult<usize> {
    let models: Vec<&'a ModelElement> = set.models.clone();
    let budget: &'a [BudgetItem] = set.budget;

    let mut index: HashMap<&'a str, Vec<usize>> = HashMap::new();
    for i in set.remaining_models() {
        if let Some(tag) = models[i].tag() {
            index.entry(tag).or_default().push(i);
        }
    }

    let mut count = 0;
    for j in set.remaining_budget() {
        let Some(code) = budget[j].code() else {
            continue;
        };
        let Some(candidates) = index.get(code) else {
            continue;
        };
        if let Some(&i) = candidates.iter().find(|&&i| !set.model_used[i]) {
            set.consume(i, j, MatchMethod::Tag, 1.0)?;
            count += 1;
        }
    }

    Ok(count)
}

/// Strategy 3: normalized name ↔ description, best score per model element.
///
/// Ties keep the earlier budget item; elements are visited in input order.
fn match_by_name(set: &mut WorkingSet, min_confidence: f64) -> ReconResult<usize> {
    let descriptions = prepare_descriptions(set);

    let mut count = 0;
    for i in set.remaining_models() {
        let names = prepare_names(set.models[i]);
        if names.is_empty() {
            continue;
        }

        let mut best: Option<(usize, f64)> = None;
        for j in set.remaining_budget() {
            let Some(desc) = &descriptions[j] else {
                continue;
            };
            let score = names
                .iter()
                .map(|n| n.name_score(desc))
                .fold(0.0_f64, f64::max);

            if score > 0.0 && score >= min_confidence && best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }

        if let Some((j, score)) = best {
            set.consume(i, j, MatchMethod::Name, score)?;
            count += 1;
        }
    }

    Ok(count)
}

/// Strategy 4: Jaccard word overlap; confidence scaled into [0.5, 0.8].
fn match_by_description(set: &mut WorkingSet, floor: f64) -> ReconResult<usize> {
    let descriptions = prepare_descriptions(set);

    let mut count = 0;
    for i in set.remaining_models() {
        let names = prepare_names(set.models[i]);
        if names.is_empty() {
            continue;
        }

        let mut best: Option<(usize, f64)> = None;
        for j in set.remaining_budget() {
            let Some(desc) = &descriptions[j] else {
                continue;
            };
            let similarity = names
                .iter()
                .map(|n| n.description_score(desc))
                .fold(0.0_f64, f64::max);

            if similarity > 0.0 && similarity >= floor && best.map_or(true, |(_, s)| similarity > s)
            {
                best = Some((j, similarity));
            }
        }

        if let Some((j, similarity)) = best {
            set.consume(i, j, MatchMethod::Description, description_confidence(similarity, floor))?;
            count += 1;
        }
    }

    Ok(count)
}

/// Map a similarity in [floor, 1] linearly onto [0.5, 0.8].
pub fn description_confidence(similarity: f64, floor: f64) -> f64 {
    if floor >= 1.0 {
        return 0.8;
    }
    let scaled = 0.5 + 0.3 * (similarity - floor) / (1.0 - floor);
    scaled.clamp(0.5, 0.8)
}

/// Prepared descriptions of still-unmatched budget items (None when consumed or blank).
fn prepare_descriptions(set: &WorkingSet) -> Vec<Option<PreparedText>> {
    set.budget
        .iter()
        .zip(&set.budget_used)
        .map(|(item, &used)| {
            if used {
                return None;
            }
            item.description()
                .map(PreparedText::new)
                .filter(|p| !p.is_empty())
        })
        .collect()
}

fn prepare_names(element: &ModelElement) -> Vec<PreparedText> {
    element
        .name_candidates()
        .into_iter()
        .map(PreparedText::new)
        .filter(|p| !p.is_empty())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::IgnoreFilter;

    fn model(id: &str, name: &str) -> ModelElement {
        ModelElement::new(id, name)
    }

    fn item(code: &str, description: &str) -> BudgetItem {
        BudgetItem::new(code, description)
    }

    #[test]
    fn test_match_by_global_id() {
        let models = vec![model("G1", "Column A"), model("G2", "Beam B")];
        let budget = vec![item("B2", "Beam").with_linked_global_id("G2")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        let matched: Vec<_> = result.matched().collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].method(), MatchMethod::GlobalId);
        assert_eq!(matched[0].confidence(), 1.0);
        assert_eq!(matched[0].model().unwrap().global_id, "G2");
        assert_eq!(result.model_only().count(), 1);
        assert_eq!(result.budget_only().count(), 0);
    }

    #[test]
    fn test_match_by_tag() {
        let models = vec![model("G1", "Column A").with_tag("T1")];
        let budget = vec![item("T1", "Something else entirely")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        let pair = &result.pairs()[0];
        assert_eq!(pair.status(), MatchStatus::Matched);
        assert_eq!(pair.method(), MatchMethod::Tag);
        assert_eq!(pair.confidence(), 1.0);
    }

    #[test]
    fn test_global_id_beats_tag() {
        let models = vec![
            model("G1", "Column A").with_tag("T1"),
            model("G2", "Column B"),
        ];
        // T1 links by id to G2, so G1 cannot take it by tag afterwards
        let budget = vec![item("T1", "Column").with_linked_global_id("G2")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        let matched: Vec<_> = result.matched().collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].method(), MatchMethod::GlobalId);
        assert_eq!(matched[0].model().unwrap().global_id, "G2");
        assert_eq!(result.model_only().next().unwrap().model().unwrap().global_id, "G1");
    }

    #[test]
    fn test_match_by_name_exact() {
        let models = vec![model("G1", "Pilar - 600 x 600 mm")];
        let budget = vec![item("350147", "pilar 600 x 600 MM")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        let pair = result.matched().next().unwrap();
        assert_eq!(pair.method(), MatchMethod::Name);
        assert_eq!(pair.confidence(), 1.0);
    }

    #[test]
    fn test_name_prefers_best_score_then_first_item() {
        let models = vec![model("G1", "Column A")];
        let budget = vec![
            item("B1", "Column A concrete"),
            item("B2", "Column A"),
            item("B3", "Column A"),
        ];
        let config = MatcherConfig {
            use_description: false,
            ..MatcherConfig::default()
        };

        let result = Matcher::new(config).unwrap().match_records(&models, &budget).unwrap();

        let pair = result.matched().next().unwrap();
        assert_eq!(pair.budget().unwrap().code, "B2");
        assert_eq!(pair.confidence(), 1.0);
    }

    #[test]
    fn test_name_below_threshold_falls_through() {
        // "Column" ⊂ "Column A concrete walls" → 0.5 + 0.5 * 1/4 = 0.625 < 0.7
        let models = vec![model("G1", "Column")];
        let budget = vec![item("B1", "Column A concrete walls")];
        let config = MatcherConfig::default().identifiers_only();
        let config = MatcherConfig {
            use_name: true,
            ..config
        };

        let result = Matcher::new(config).unwrap().match_records(&models, &budget).unwrap();

        assert_eq!(result.match_count(), 0);
        assert_eq!(result.model_only().count(), 1);
        assert_eq!(result.budget_only().count(), 1);
    }

    #[test]
    fn test_match_by_description() {
        let models = vec![model("G1", "Pilar rectangular hormigón armado")];
        let budget = vec![item("C01", "Pilar de hormigón armado HA-25")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        let pair = result.matched().next().unwrap();
        assert_eq!(pair.method(), MatchMethod::Description);
        assert!(pair.confidence() >= 0.5 && pair.confidence() <= 0.8);
    }

    fn method_with(
        config: MatcherConfig,
        models: &[ModelElement],
        budget: &[BudgetItem],
    ) -> MatchMethod {
        let result = Matcher::new(config).unwrap().match_records(models, budget).unwrap();
        assert_eq!(result.match_count(), 1);
        let method = result.matched().next().unwrap().method();
        method
    }

    #[test]
    fn test_disabled_global_id_falls_to_tag() {
        let models = vec![model("G1", "Column A").with_tag("T1")];
        let budget = vec![item("T1", "Column A").with_linked_global_id("G1")];

        assert_eq!(method_with(MatcherConfig::default(), &models, &budget), MatchMethod::GlobalId);

        let config = MatcherConfig {
            use_global_id: false,
            ..MatcherConfig::default()
        };
        assert_eq!(method_with(config, &models, &budget), MatchMethod::Tag);
    }

    #[test]
    fn test_disabled_tag_falls_to_name() {
        let models = vec![model("G1", "Column A").with_tag("T1")];
        let budget = vec![item("T1", "Column A")];

        let config = MatcherConfig {
            use_tag: false,
            ..MatcherConfig::default()
        };
        assert_eq!(method_with(config, &models, &budget), MatchMethod::Name);
    }

    #[test]
    fn test_disabled_name_falls_to_description() {
        // Name score 0.875 (subset), Jaccard 1.0 once "de" is dropped
        let models = vec![model("G1", "Muro de ladrillo cerámico")];
        let budget = vec![item("M01", "Muro ladrillo cerámico")];

        assert_eq!(method_with(MatcherConfig::default(), &models, &budget), MatchMethod::Name);

        let config = MatcherConfig {
            use_name: false,
            ..MatcherConfig::default()
        };
        let result = Matcher::new(config).unwrap().match_records(&models, &budget).unwrap();
        let pair = result.matched().next().unwrap();
        assert_eq!(pair.method(), MatchMethod::Description);
        assert!((pair.confidence() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_all_strategies_disabled() {
        let models = vec![model("G1", "Column A").with_tag("T1")];
        let budget = vec![item("T1", "Column A").with_linked_global_id("G1")];
        let config = MatcherConfig {
            use_global_id: false,
            use_tag: false,
            ..MatcherConfig::default().identifiers_only()
        };

        let result = Matcher::new(config).unwrap().match_records(&models, &budget).unwrap();
        assert_eq!(result.match_count(), 0);
        assert_eq!(result.model_only().count(), 1);
        assert_eq!(result.budget_only().count(), 1);
    }

    #[test]
    fn test_description_floor_independent_of_min_confidence() {
        // {muro, ladrillo} vs {muro, hormigón} → Jaccard 1/3, no name subset
        let models = vec![model("G1", "Muro ladrillo")];
        let budget = vec![item("M01", "Muro hormigón")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();
        assert_eq!(result.match_count(), 0);

        let config = MatcherConfig {
            description_floor: 0.3,
            ..MatcherConfig::default()
        };
        assert_eq!(config.min_confidence, 0.7);
        let result = Matcher::new(config).unwrap().match_records(&models, &budget).unwrap();

        let pair = result.matched().next().unwrap();
        assert_eq!(pair.method(), MatchMethod::Description);
        let expected = description_confidence(1.0 / 3.0, 0.3);
        assert!((pair.confidence() - expected).abs() < 1e-12);
        assert!(pair.confidence() > 0.5 && pair.confidence() < 0.8);
    }

    #[test]
    fn test_description_confidence_scaling() {
        assert_eq!(description_confidence(0.5, 0.5), 0.5);
        assert!((description_confidence(1.0, 0.5) - 0.8).abs() < 1e-12);
        assert!((description_confidence(0.75, 0.5) - 0.65).abs() < 1e-12);
        assert_eq!(description_confidence(1.0, 1.0), 0.8);
    }

    #[test]
    fn test_blank_identifiers_skip_tier() {
        let models = vec![model("", "Column A").with_tag("  ")];
        let budget = vec![item("", "Beam B").with_linked_global_id("")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();

        assert_eq!(result.match_count(), 0);
        assert_eq!(result.pairs().len(), 2);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let models = vec![model("G1", "A"), model("G1", "B")];
        let err = Matcher::default().match_records(&models, &[]).unwrap_err();
        assert_eq!(err, ReconError::DuplicateModelId("G1".to_string()));

        let budget = vec![item("C1", "A"), item("C1", "B")];
        let err = Matcher::default().match_records(&[], &budget).unwrap_err();
        assert_eq!(err, ReconError::DuplicateBudgetCode("C1".to_string()));
    }

    #[test]
    fn test_ignore_filter_removes_elements() {
        let models = vec![model("G1", "Project Information"), model("G2", "Column A")];
        let config = MatcherConfig {
            ignore: Some(IgnoreFilter::new()),
            ..MatcherConfig::default()
        };

        let result = Matcher::new(config).unwrap().match_records(&models, &[]).unwrap();

        assert_eq!(result.ignored().len(), 1);
        assert_eq!(result.ignored()[0].global_id, "G1");
        assert_eq!(result.pairs().len(), 1);
        assert_eq!(result.total_model(), 1);
    }

    #[test]
    fn test_ignore_predicate() {
        let models = vec![
            model("G1", "Column A").with_class_name("IfcSpace"),
            model("G2", "Column B"),
        ];

        let matcher = Matcher::default().with_ignore_predicate(|m| m.class_name == "IfcSpace");
        let result = matcher.match_records(&models, &[]).unwrap();

        assert_eq!(result.ignored().len(), 1);
        assert_eq!(result.model_only().count(), 1);
    }

    #[test]
    fn test_pair_order() {
        let models = vec![
            model("G1", "Ventana aluminio"),
            model("G2", "Puerta").with_tag("P1"),
            model("G3", "Column A"),
            model("G4", "Orphan element"),
        ];
        let budget = vec![
            item("X9", "Unrelated line"),
            item("V1", "Ventana aluminio"),
            item("P1", "Puerta de paso"),
            item("L1", "Linked").with_linked_global_id("G3"),
        ];

        let result = Matcher::default().match_records(&models, &budget).unwrap();
        let methods: Vec<_> = result.pairs().iter().map(|p| p.method()).collect();

        assert_eq!(
            methods,
            vec![
                MatchMethod::GlobalId,
                MatchMethod::Tag,
                MatchMethod::Name,
                MatchMethod::None,
                MatchMethod::None,
            ]
        );
        assert_eq!(result.pairs()[3].status(), MatchStatus::ModelOnly);
        assert_eq!(result.pairs()[4].status(), MatchStatus::BudgetOnly);
    }

    #[test]
    fn test_pair_contract() {
        assert_eq!(
            MatchedPair::new(MatchStatus::Matched, MatchMethod::Tag, None, None, 1.0),
            Err(ReconError::EmptyPair)
        );

        let element = model("G1", "A");
        let err = MatchedPair::new(MatchStatus::Matched, MatchMethod::Tag, Some(&element), None, 1.0)
            .unwrap_err();
        assert!(matches!(err, ReconError::InconsistentPair { has_budget: false, .. }));

        let budget = item("C1", "A");
        let err = MatchedPair::matched(&element, &budget, MatchMethod::Name, 1.5).unwrap_err();
        assert_eq!(err, ReconError::ConfidenceOutOfRange(1.5));

        let err = MatchedPair::matched(&element, &budget, MatchMethod::None, 1.0).unwrap_err();
        assert!(matches!(err, ReconError::InconsistentPair { .. }));
    }

    #[test]
    fn test_pair_code_and_name() {
        let element = model("G1", "Column A").with_tag("T1");
        let budget = item("C1", "Pilar");

        let pair = MatchedPair::matched(&element, &budget, MatchMethod::Name, 0.9).unwrap();
        assert_eq!(pair.code(), Some("C1"));
        assert_eq!(pair.name(), "Pilar");

        let pair = MatchedPair::model_only(&element);
        assert_eq!(pair.code(), Some("T1"));
        assert_eq!(pair.name(), "Column A");

        let bare = model("G9", "");
        let pair = MatchedPair::model_only(&bare);
        assert_eq!(pair.code(), Some("G9"));
        assert_eq!(pair.name(), "Unknown");
    }

    #[test]
    fn test_summary_and_rate() {
        let models = vec![model("G1", "A").with_tag("T1"), model("G2", "B")];
        let budget = vec![item("T1", "x"), item("C2", "y")];

        let result = Matcher::default().match_records(&models, &budget).unwrap();
        let summary = result.summary();

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.model_only, 1);
        assert_eq!(summary.budget_only, 1);
        assert_eq!(summary.by_method.get(&MatchMethod::Tag), Some(&1));
        assert!((summary.match_rate - 50.0).abs() < 1e-9);
        assert_eq!(result.by_method(MatchMethod::Tag).len(), 1);
        assert_eq!(result.high_confidence(0.9).len(), 1);

        println!("✅ {}", summary);
    }

    #[test]
    fn test_empty_inputs() {
        let result = Matcher::default().match_records(&[], &[]).unwrap();
        assert!(result.pairs().is_empty());
        assert_eq!(result.match_rate(), 0.0);
    }

    #[test]
    fn test_serializes_screaming_snake() {
        let element = model("G1", "A");
        let pair = MatchedPair::model_only(&element);
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["status"], "MODEL_ONLY");
        assert_eq!(json["method"], "NONE");
        assert_eq!(json["model"]["globalId"], "G1");
    }
}
