//! Cross-field rules. Each rule has a fixed remediation, so the decoders only decide
//! *whether* a record violates a rule, never what to do about it.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::ErrorKind;
use crate::normalize::path::FieldPath;
use crate::normalize::ProcessingState;
use crate::protocol::{
    ClientSdkInfo, DebugImage, Event, EventId, Exception, Frame, Mechanism, NativeImageKind,
    Stacktrace, ThreadId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Remove the record from its parent, keeping the parent.
    DropRecord,
    /// Keep the record as is and report the violation.
    AnnotateOnly,
    /// Replace the value with a valid one.
    Regenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    ExceptionTypeOrValue,
    MechanismType,
    NativeImageDebugId,
    AppleImageAddress,
    PeImageCodeFile,
    ProguardImageUuid,
    EventIdFormat,
    ThreadIdUnique,
    ThreadStacktraceConflict,
    FrameLocation,
    StacktraceFrames,
    SdkNameVersion,
}

impl Rule {
    pub const ALL: [Rule; 12] = [
        Rule::ExceptionTypeOrValue,
        Rule::MechanismType,
        Rule::NativeImageDebugId,
        Rule::AppleImageAddress,
        Rule::PeImageCodeFile,
        Rule::ProguardImageUuid,
        Rule::EventIdFormat,
        Rule::ThreadIdUnique,
        Rule::ThreadStacktraceConflict,
        Rule::FrameLocation,
        Rule::StacktraceFrames,
        Rule::SdkNameVersion,
    ];

    pub fn remediation(&self) -> Remediation {
        match self {
            Rule::ExceptionTypeOrValue => Remediation::DropRecord,
            Rule::MechanismType => Remediation::DropRecord,
            Rule::NativeImageDebugId => Remediation::DropRecord,
            Rule::ProguardImageUuid => Remediation::DropRecord,
            Rule::StacktraceFrames => Remediation::DropRecord,
            Rule::SdkNameVersion => Remediation::DropRecord,
            Rule::AppleImageAddress => Remediation::AnnotateOnly,
            Rule::PeImageCodeFile => Remediation::AnnotateOnly,
            Rule::ThreadIdUnique => Remediation::AnnotateOnly,
            Rule::ThreadStacktraceConflict => Remediation::AnnotateOnly,
            Rule::FrameLocation => Remediation::AnnotateOnly,
            Rule::EventIdFormat => Remediation::Regenerate,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Rule::EventIdFormat => ErrorKind::InvalidEventId,
            Rule::ThreadIdUnique => ErrorKind::DuplicateThreadId,
            Rule::ThreadStacktraceConflict => ErrorKind::DuplicateStacktrace,
            Rule::FrameLocation => ErrorKind::MissingFrameLocation,
            Rule::ExceptionTypeOrValue
            | Rule::MechanismType
            | Rule::NativeImageDebugId
            | Rule::AppleImageAddress
            | Rule::PeImageCodeFile
            | Rule::ProguardImageUuid
            | Rule::StacktraceFrames
            | Rule::SdkNameVersion => ErrorKind::MissingAttribute,
        }
    }

    /// The record the rule is checked on.
    pub fn scope(&self) -> &'static str {
        match self {
            Rule::ExceptionTypeOrValue => "exception",
            Rule::MechanismType => "mechanism",
            Rule::NativeImageDebugId
            | Rule::AppleImageAddress
            | Rule::PeImageCodeFile
            | Rule::ProguardImageUuid => "debug_image",
            Rule::EventIdFormat | Rule::ThreadIdUnique | Rule::ThreadStacktraceConflict => "event",
            Rule::FrameLocation => "frame",
            Rule::StacktraceFrames => "stacktrace",
            Rule::SdkNameVersion => "sdk",
        }
    }
}

/// Record-scoped rules.
pub trait Validate {
    fn violations(&self) -> Vec<Rule>;
}

impl Validate for Exception {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.ty.is_none() && self.value.is_none() {
            rules.push(Rule::ExceptionTypeOrValue);
        }
        rules
    }
}

impl Validate for Mechanism {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.ty.is_none() {
            rules.push(Rule::MechanismType);
        }
        rules
    }
}

impl Validate for Stacktrace {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.frames.is_empty() {
            rules.push(Rule::StacktraceFrames);
        }
        rules
    }
}

impl Validate for Frame {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if !self.has_location() {
            rules.push(Rule::FrameLocation);
        }
        rules
    }
}

impl Validate for ClientSdkInfo {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.name.is_none() || self.version.is_none() {
            rules.push(Rule::SdkNameVersion);
        }
        rules
    }
}

impl Validate for DebugImage {
    fn violations(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        match self {
            DebugImage::Apple(image) => {
                if image.image_addr.is_none() || image.image_size.is_none() {
                    rules.push(Rule::AppleImageAddress);
                }
            }
            DebugImage::Native(image) => {
                if image.debug_id.is_none() {
                    rules.push(Rule::NativeImageDebugId);
                }
                if image.kind == NativeImageKind::Pe && image.code_file.is_none() {
                    rules.push(Rule::PeImageCodeFile);
                }
            }
            DebugImage::Proguard(image) => {
                if image.uuid.is_none() {
                    rules.push(Rule::ProguardImageUuid);
                }
            }
            DebugImage::Other(_) => {}
        }
        rules
    }
}

/// Runs the record's rules. A dropping rule wins over everything else; the error
/// then carries the record as it stood when it was dropped.
pub fn apply<T>(record: T, path: &FieldPath, state: &mut ProcessingState) -> Option<T>
where
    T: Validate + Serialize,
{
    let violations = record.violations();

    if let Some(rule) = violations
        .iter()
        .find(|rule| rule.remediation() == Remediation::DropRecord)
    {
        tracing::debug!(rule = ?rule, scope = rule.scope(), "record violates a required rule");
        let value = serde_json::to_value(&record).ok();
        state.dropped(path, rule.kind(), value);
        return None;
    }

    for rule in violations {
        state.push(path, rule.kind(), None);
    }
    Some(record)
}

/// A canonical id is kept, a non-canonical but readable one is rewritten, anything
/// else is replaced by a fresh id. Only a missing id is backfilled silently.
pub fn resolve_event_id(
    value: Option<Value>,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<EventId> {
    let Some(value) = value else {
        return state.config().backfill_event_id.then(EventId::new);
    };

    if let Some(id) = value.as_str().and_then(EventId::parse_canonical) {
        return Some(id);
    }

    let lenient = match &value {
        Value::String(s) => EventId::parse_lenient(s),
        Value::Number(n) => n
            .as_u64()
            .map(|n| EventId::from_uuid(uuid::Uuid::from_u128(u128::from(n)))),
        _ => None,
    };
    state.push(path, Rule::EventIdFormat.kind(), Some(value));
    Some(lenient.unwrap_or_default())
}

/// Rules that span several records of the event. Errors use the same names the
/// record decoders would.
pub fn validate_event(event: &Event, state: &mut ProcessingState) {
    let root = FieldPath::root();

    let threads = root.key("threads").key("values");
    let mut seen: HashSet<&ThreadId> = HashSet::new();
    for (index, thread) in event.threads().iter().enumerate() {
        let Some(id) = &thread.id else {
            continue;
        };
        if !seen.insert(id) {
            state.push(
                &threads.index(index).key("id"),
                Rule::ThreadIdUnique.kind(),
                Some(Value::String(id.to_string())),
            );
        }
    }

    let exceptions = root.key("exception").key("values");
    for (index, exception) in event.exceptions().iter().enumerate() {
        let (Some(thread_id), Some(_)) = (&exception.thread_id, &exception.stacktrace) else {
            continue;
        };
        let conflict = event
            .threads()
            .iter()
            .any(|t| t.id.as_ref() == Some(thread_id) && t.stacktrace.is_some());
        if conflict {
            state.push(
                &exceptions.index(index).key("thread_id"),
                Rule::ThreadStacktraceConflict.kind(),
                Some(Value::String(thread_id.to_string())),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::normalize::NormalizeConfig;
    use crate::protocol::{AppleDebugImage, NativeDebugImage, Thread, Values};

    fn new_state() -> ProcessingState {
        ProcessingState::new(&NormalizeConfig::default())
    }

    #[test]
    fn every_rule_has_a_kind_and_scope() {
        for rule in Rule::ALL {
            assert!(!rule.kind().as_str().is_empty());
            assert!(!rule.scope().is_empty());
        }
        assert_eq!(
            Rule::ExceptionTypeOrValue.remediation(),
            Remediation::DropRecord
        );
        assert_eq!(Rule::ThreadIdUnique.remediation(), Remediation::AnnotateOnly);
        assert_eq!(Rule::EventIdFormat.remediation(), Remediation::Regenerate);
    }

    #[test]
    fn dropping_rules_remove_the_record() {
        let mut state = new_state();
        let path = FieldPath::root().key("exception").key("values").index(0);

        assert!(apply(Exception::default(), &path, &mut state).is_none());
        let kept = Exception {
            value: Some("boom".to_string()),
            ..Default::default()
        };
        assert!(apply(kept, &path, &mut state).is_some());

        let errors = state.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingAttribute);
        assert_eq!(errors[0].value, Some(json!({})));
    }

    #[test]
    fn debug_image_rules() {
        let mut state = new_state();
        let path = FieldPath::root().key("debug_meta").key("images").index(0);

        let apple = DebugImage::Apple(Box::new(AppleDebugImage {
            name: Some("/usr/lib/libSystem.B.dylib".to_string()),
            ..Default::default()
        }));
        assert!(apply(apple, &path, &mut state).is_some());

        // Dropping wins over the annotate-only code_file rule
        let pe = DebugImage::Native(Box::new(NativeDebugImage::new(NativeImageKind::Pe)));
        assert_eq!(
            pe.violations(),
            vec![Rule::NativeImageDebugId, Rule::PeImageCodeFile]
        );
        assert!(apply(pe, &path, &mut state).is_none());

        let errors = state.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].value, None);
        assert_eq!(errors[1].value, Some(json!({"type": "pe"})));
    }

    #[test]
    fn event_ids() {
        let mut state = new_state();
        let path = FieldPath::root().key("event_id");

        let canonical = resolve_event_id(
            Some(json!("fc6d8c0c43fc4630ad850ee518f1b9d0")),
            &path,
            &mut state,
        );
        assert_eq!(
            canonical.unwrap().to_string(),
            "fc6d8c0c43fc4630ad850ee518f1b9d0"
        );
        assert!(resolve_event_id(None, &path, &mut state).is_some());
        assert!(state.into_errors().is_empty());

        let mut state = new_state();
        let dashed = resolve_event_id(
            Some(json!("FC6D8C0C-43FC-4630-AD85-0EE518F1B9D0")),
            &path,
            &mut state,
        );
        assert_eq!(
            dashed.unwrap().to_string(),
            "fc6d8c0c43fc4630ad850ee518f1b9d0"
        );
        let garbage = resolve_event_id(Some(json!("garbage")), &path, &mut state);
        assert_eq!(garbage.unwrap().to_string().len(), 32);

        let errors = state.into_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::InvalidEventId));
        assert_eq!(errors[0].name.as_deref(), Some("event_id"));

        let config = NormalizeConfig {
            backfill_event_id: false,
            ..Default::default()
        };
        let mut state = ProcessingState::new(&config);
        assert!(resolve_event_id(None, &path, &mut state).is_none());
    }

    #[test]
    fn thread_rules_annotate_only() {
        let thread = |id: &str, with_stack: bool| Thread {
            id: Some(ThreadId::new(id)),
            stacktrace: with_stack.then(Stacktrace::default),
            ..Default::default()
        };
        let event = Event {
            threads: Some(Values::new(vec![
                thread("1", true),
                thread("2", false),
                thread("1", false),
            ])),
            exception: Some(Values::new(vec![Exception {
                ty: Some("SIGSEGV".to_string()),
                thread_id: Some(ThreadId::new("1")),
                stacktrace: Some(Stacktrace::default()),
                ..Default::default()
            }])),
            ..Default::default()
        };

        let mut state = new_state();
        validate_event(&event, &mut state);
        let errors = state.into_errors();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name.as_deref(), Some("threads.values.2.id"));
        assert_eq!(errors[0].kind, ErrorKind::DuplicateThreadId);
        assert_eq!(
            errors[1].name.as_deref(),
            Some("exception.values.0.thread_id")
        );
        assert_eq!(errors[1].kind, ErrorKind::DuplicateStacktrace);
    }
}
