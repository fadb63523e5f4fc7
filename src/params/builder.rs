//! Lazy, persistent parameter-space builders.
//!
//! A builder is an immutable list of stages. Every combinator returns a new
//! builder that shares the earlier stages (`im::Vector` structural sharing),
//! so the original stays usable. Iterating a builder re-runs every stage from
//! a single empty record, which makes the sequence restartable: validation
//! and execution each walk it independently.
//!
//! Case-level stages produce the addressable case records. After
//! [`CaseParamsBuilder::begin_subcases`], stages produce subcase records
//! per case; their predicates and generators see `case ⊕ subcase`.

use super::{ParamRecord, ParamValue};
use crate::errors::{ErrorKind, HarnessError};
use im::Vector;
use std::iter;
use std::rc::Rc;

type Records = Box<dyn Iterator<Item = Result<ParamRecord, HarnessError>>>;

/// One expansion step: `(context, record) -> records`. The context is the
/// enclosing case record at subcase level and empty at case level.
type Stage = Rc<dyn Fn(&ParamRecord, ParamRecord) -> Records>;

/// One case of an expanded parameter space.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseEntry {
    pub params: ParamRecord,
    /// `None` when the test has no subcase level.
    pub subcases: Option<Vec<ParamRecord>>,
}

/// Anything that can enumerate `(case, subcases)` pairs.
pub trait ParamsSource {
    fn iterate_cases_with_subcases(&self) -> Box<dyn Iterator<Item = Result<CaseEntry, HarnessError>>>;
}

/// A value bound under the option's name, plus sub-options merged alongside it.
#[derive(Debug, Clone)]
pub struct ParamOption {
    pub value: ParamValue,
    pub extra: ParamRecord,
}

impl ParamOption {
    pub fn new(value: impl Into<ParamValue>) -> Self {
        Self {
            value: value.into(),
            extra: ParamRecord::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra = self.extra.with(key, value);
        self
    }
}

// ============================================================================
// STAGES
// ============================================================================

fn fail(error: HarnessError) -> Records {
    Box::new(iter::once(Err(error)))
}

fn duplicate_key(key: &str) -> HarnessError {
    HarnessError::new(ErrorKind::DuplicateParamKey {
        key: key.to_string(),
    })
}

/// The record predicates and generators look at.
fn visible(context: &ParamRecord, record: &ParamRecord) -> Result<ParamRecord, HarnessError> {
    if context.is_empty() {
        Ok(record.clone())
    } else {
        context.merge(record)
    }
}

/// `record ∪ extra`, failing on any shared key.
fn union(
    context: &ParamRecord,
    record: &ParamRecord,
    extra: &ParamRecord,
) -> Result<ParamRecord, HarnessError> {
    let mut out = record.clone();
    for (key, value) in extra.iter() {
        if context.contains_key(key) {
            return Err(duplicate_key(key));
        }
        out.insert_new(key, value.clone())?;
    }
    Ok(out)
}

fn run_stages(stages: &Vector<Stage>, context: Rc<ParamRecord>) -> Records {
    let mut records: Records = Box::new(iter::once(Ok(ParamRecord::new())));
    for stage in stages.iter().cloned() {
        let context = Rc::clone(&context);
        records = Box::new(records.flat_map(move |record| match record {
            Ok(record) => stage(&*context, record),
            Err(e) => fail(e),
        }));
    }
    records
}

fn combine_stage(name: String, values: Vec<ParamValue>) -> Stage {
    let values = Rc::new(values);
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        if record.contains_key(&name) || context.contains_key(&name) {
            return fail(duplicate_key(&name));
        }
        let name = name.clone();
        let values = Rc::clone(&values);
        Box::new((0..values.len()).map(move |i| {
            Ok::<_, HarnessError>(record.clone().with(name.clone(), values[i].clone()))
        }))
    })
}

fn combine_options_stage(name: String, options: Vec<ParamOption>) -> Stage {
    let options = Rc::new(options);
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        if record.contains_key(&name) || context.contains_key(&name) {
            return fail(duplicate_key(&name));
        }
        let name = name.clone();
        let options = Rc::clone(&options);
        let context = context.clone();
        Box::new((0..options.len()).map(move |i| {
            let option = &options[i];
            let bound = record.clone().with(name.clone(), option.value.clone());
            union(&context, &bound, &option.extra)
        }))
    })
}

fn combine_with_params_stage(records: Vec<ParamRecord>) -> Stage {
    let records = Rc::new(records);
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        let records = Rc::clone(&records);
        let context = context.clone();
        Box::new((0..records.len()).map(move |i| union(&context, &record, &records[i])))
    })
}

fn filter_stage(keep: Rc<dyn Fn(&ParamRecord) -> bool>) -> Stage {
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        match visible(context, &record) {
            Ok(view) if keep(&view) => Box::new(iter::once(Ok(record))),
            Ok(_) => Box::new(iter::empty()),
            Err(e) => fail(e),
        }
    })
}

fn expand_stage(name: String, generate: Rc<dyn Fn(&ParamRecord) -> Vec<ParamValue>>) -> Stage {
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        if record.contains_key(&name) || context.contains_key(&name) {
            return fail(duplicate_key(&name));
        }
        let values = match visible(context, &record) {
            Ok(view) => generate(&view),
            Err(e) => return fail(e),
        };
        let name = name.clone();
        Box::new(
            values
                .into_iter()
                .map(move |value| Ok(record.clone().with(name.clone(), value))),
        )
    })
}

fn expand_with_params_stage(generate: Rc<dyn Fn(&ParamRecord) -> Vec<ParamRecord>>) -> Stage {
    Rc::new(move |context: &ParamRecord, record: ParamRecord| -> Records {
        let extras = match visible(context, &record) {
            Ok(view) => generate(&view),
            Err(e) => return fail(e),
        };
        let context = context.clone();
        Box::new(
            extras
                .into_iter()
                .map(move |extra| union(&context, &record, &extra)),
        )
    })
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Builds the case level of a parameter space.
///
/// The default builder yields a single empty case.
#[derive(Clone, Default)]
pub struct CaseParamsBuilder {
    stages: Vector<Stage>,
}

/// Builds the subcase level on top of a [`CaseParamsBuilder`].
#[derive(Clone)]
pub struct SubcaseParamsBuilder {
    cases: CaseParamsBuilder,
    stages: Vector<Stage>,
}

macro_rules! combinators {
    () => {
        /// Cross product: one entry per existing entry per value, bound under `name`.
        /// Fails if `name` is already bound.
        pub fn combine<I, V>(&self, name: impl Into<String>, values: I) -> Self
        where
            I: IntoIterator<Item = V>,
            V: Into<ParamValue>,
        {
            let values = values.into_iter().map(Into::into).collect();
            self.push(combine_stage(name.into(), values))
        }

        /// Like [`combine`](Self::combine), but each option also merges its sub-options.
        pub fn combine_options(
            &self,
            name: impl Into<String>,
            options: impl IntoIterator<Item = ParamOption>,
        ) -> Self {
            self.push(combine_options_stage(name.into(), options.into_iter().collect()))
        }

        /// Cross product with whole records.
        pub fn combine_with_params(&self, records: impl IntoIterator<Item = ParamRecord>) -> Self {
            self.push(combine_with_params_stage(records.into_iter().collect()))
        }

        /// Keeps entries for which `predicate` holds.
        pub fn filter(&self, predicate: impl Fn(&ParamRecord) -> bool + 'static) -> Self {
            self.push(filter_stage(Rc::new(predicate)))
        }

        /// Drops entries for which `predicate` holds.
        pub fn unless(&self, predicate: impl Fn(&ParamRecord) -> bool + 'static) -> Self {
            self.push(filter_stage(Rc::new(move |p: &ParamRecord| !predicate(p))))
        }

        /// Fans each entry out over the values `generate` produces for it.
        pub fn expand<I, V>(
            &self,
            name: impl Into<String>,
            generate: impl Fn(&ParamRecord) -> I + 'static,
        ) -> Self
        where
            I: IntoIterator<Item = V>,
            V: Into<ParamValue>,
        {
            let values = move |p: &ParamRecord| -> Vec<ParamValue> {
                generate(p).into_iter().map(Into::into).collect()
            };
            self.push(expand_stage(name.into(), Rc::new(values)))
        }

        /// Fans each entry out over the records `generate` produces for it.
        pub fn expand_with_params<I>(&self, generate: impl Fn(&ParamRecord) -> I + 'static) -> Self
        where
            I: IntoIterator<Item = ParamRecord>,
        {
            let records = move |p: &ParamRecord| -> Vec<ParamRecord> { generate(p).into_iter().collect() };
            self.push(expand_with_params_stage(Rc::new(records)))
        }
    };
}

impl CaseParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, stage: Stage) -> Self {
        let mut stages = self.stages.clone();
        stages.push_back(stage);
        Self { stages }
    }

    combinators!();

    /// Ends the case level; later stages enumerate subcases.
    pub fn begin_subcases(&self) -> SubcaseParamsBuilder {
        SubcaseParamsBuilder {
            cases: self.clone(),
            stages: Vector::new(),
        }
    }

    /// The case records, lazily.
    pub fn iter(&self) -> impl Iterator<Item = Result<ParamRecord, HarnessError>> {
        run_stages(&self.stages, Rc::new(ParamRecord::new()))
    }
}

impl SubcaseParamsBuilder {
    fn push(&self, stage: Stage) -> Self {
        let mut stages = self.stages.clone();
        stages.push_back(stage);
        Self {
            cases: self.cases.clone(),
            stages,
        }
    }

    combinators!();

    /// The subcase records of one case.
    pub fn subcases(&self, case: &ParamRecord) -> impl Iterator<Item = Result<ParamRecord, HarnessError>> {
        run_stages(&self.stages, Rc::new(case.clone()))
    }
}

impl ParamsSource for CaseParamsBuilder {
    fn iterate_cases_with_subcases(&self) -> Box<dyn Iterator<Item = Result<CaseEntry, HarnessError>>> {
        Box::new(self.iter().map(|params| {
            params.map(|params| CaseEntry {
                params,
                subcases: None,
            })
        }))
    }
}

impl ParamsSource for SubcaseParamsBuilder {
    fn iterate_cases_with_subcases(&self) -> Box<dyn Iterator<Item = Result<CaseEntry, HarnessError>>> {
        let this = self.clone();
        Box::new(self.cases.iter().filter_map(move |params| {
            let params = match params {
                Ok(params) => params,
                Err(e) => return Some(Err(e)),
            };
            match this.subcases(&params).collect::<Result<Vec<_>, _>>() {
                Ok(subcases) if subcases.is_empty() => None,
                Ok(subcases) => Some(Ok(CaseEntry {
                    params,
                    subcases: Some(subcases),
                })),
                Err(e) => Some(Err(e)),
            }
        }))
    }
}
