//! Scenario algebra: composable descriptions of multi-step conversations.
//!
//! A [`Scenario`] is an immutable value describing what to wait for, what to
//! do, and what to do next. Driving it over a stream of updates either
//! completes with a value, falls through silently (an expected update never
//! arrived or did not match), or fails with a raised error.
//!
//! Internally a scenario is a tagged node tree; sequencing erases the
//! intermediate value types behind `dyn Any` so the interpreter can run an
//! explicit continuation stack instead of recursing through bind chains.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::{Future, Stream, StreamExt};

use crate::error::{BotError, Result};
use crate::expect::Expect;
use crate::types::Update;

type AnyValue = Box<dyn Any + Send>;
type ValueThunk = Arc<dyn Fn() -> AnyValue + Send + Sync>;
type Project = Arc<dyn Fn(&Update) -> Option<AnyValue> + Send + Sync>;
type EffectFn = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyValue>> + Send + Sync>;
type Cont = Arc<dyn Fn(AnyValue) -> Node + Send + Sync>;
type Recover = Arc<dyn Fn(BotError) -> Node + Send + Sync>;

/// How an expectation node consumes the update stream.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Scan updates until the first match.
    FirstMatch,
    /// Look at exactly one update; a mismatch ends the scenario.
    NextOnly,
}

#[derive(Clone)]
enum Node {
    Pure(ValueThunk),
    Done,
    Raise(BotError),
    Expect { mode: Wait, project: Project },
    Eval(EffectFn),
    Bind { inner: Box<Node>, cont: Cont },
    Handle { inner: Box<Node>, recover: Recover },
}

/// Wraps a value produced mid-run into a node the interpreter consumes once.
fn lift(value: AnyValue) -> Node {
    let slot = Mutex::new(Some(value));
    Node::Pure(Arc::new(move || {
        slot.lock()
            .expect("scenario value slot poisoned")
            .take()
            .expect("scenario value consumed twice")
    }))
}

/// Result of driving a scenario over an update stream.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The scenario produced its value.
    Completed(T),
    /// The scenario ended silently: the stream ran out, a `next` did not
    /// match, or `done` was reached. Not an error.
    FellThrough,
    /// An error was raised and no handler caught it.
    Failed(BotError),
}

impl<T: PartialEq> PartialEq for Outcome<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Outcome::Completed(a), Outcome::Completed(b)) => a == b,
            (Outcome::FellThrough, Outcome::FellThrough) => true,
            (Outcome::Failed(a), Outcome::Failed(b)) => a == b,
            _ => false,
        }
    }
}

enum Frame {
    Bind(Cont),
    Handle(Recover),
}

/// A composable, suspendable description of a conversational interaction.
///
/// Values are immutable and freely shareable: cloning is cheap and two runs
/// of the same scenario never interfere, because all execution state lives
/// in the interpreter.
pub struct Scenario<T> {
    node: Node,
    _out: PhantomData<fn() -> T>,
}

impl<T> Clone for Scenario<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _out: PhantomData,
        }
    }
}

impl<T: Send + 'static> Scenario<T> {
    fn from_node(node: Node) -> Self {
        Self {
            node,
            _out: PhantomData,
        }
    }

    fn erase(expect: Expect<T>) -> Project {
        Arc::new(move |update| {
            expect
                .check(update)
                .map(|value| Box::new(value) as AnyValue)
        })
    }

    /// Waits for the first update matching `expect`; non-matching updates
    /// are dropped. If the stream ends first, the scenario falls through.
    pub fn start(expect: Expect<T>) -> Self {
        Self::from_node(Node::Expect {
            mode: Wait::FirstMatch,
            project: Self::erase(expect),
        })
    }

    /// Consumes exactly one update. Any update ends the wait: on a match the
    /// scenario continues with the value, otherwise it falls through.
    pub fn next(expect: Expect<T>) -> Self {
        Self::from_node(Node::Expect {
            mode: Wait::NextOnly,
            project: Self::erase(expect),
        })
    }

    /// Runs a side effect. No update is consumed; an `Err` raises inside the
    /// scenario and is catchable with [`or_else`](Scenario::or_else).
    pub fn eval<F, Fut>(effect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let erased: EffectFn = Arc::new(move || {
            let fut = effect();
            Box::pin(async move { fut.await.map(|value| Box::new(value) as AnyValue) })
        });
        Self::from_node(Node::Eval(erased))
    }

    /// Yields `value` without consuming updates.
    pub fn pure(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_node(Node::Pure(Arc::new(move || Box::new(value.clone()) as AnyValue)))
    }

    /// Terminates the scenario silently, yielding nothing. Not catchable.
    pub fn done() -> Self {
        Self::from_node(Node::Done)
    }

    /// Raises `error` inside the scenario.
    pub fn raise(error: BotError) -> Self {
        Self::from_node(Node::Raise(error))
    }

    /// Sequential composition: runs `self`, then the scenario built from its
    /// value. The continuation keeps consuming the same update stream.
    pub fn and_then<U, K>(self, k: K) -> Scenario<U>
    where
        U: Send + 'static,
        K: Fn(T) -> Scenario<U> + Send + Sync + 'static,
    {
        let cont: Cont = Arc::new(move |value: AnyValue| match value.downcast::<T>() {
            Ok(value) => k(*value).node,
            Err(_) => type_mismatch(),
        });
        Scenario::from_node(Node::Bind {
            inner: Box::new(self.node),
            cont,
        })
    }

    /// Transforms the produced value.
    pub fn map<U, F>(self, f: F) -> Scenario<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let cont: Cont = Arc::new(move |value: AnyValue| match value.downcast::<T>() {
            Ok(value) => lift(Box::new(f(*value))),
            Err(_) => type_mismatch(),
        });
        Scenario::from_node(Node::Bind {
            inner: Box::new(self.node),
            cont,
        })
    }

    /// Runs `recover` if `self` raises. Fall-through (including `done`) is
    /// not an error and passes straight through.
    pub fn or_else<R>(self, recover: R) -> Self
    where
        R: Fn(BotError) -> Scenario<T> + Send + Sync + 'static,
    {
        Self::from_node(Node::Handle {
            inner: Box::new(self.node),
            recover: Arc::new(move |error| recover(error).node),
        })
    }

    /// Non-raising variant of [`or_else`](Scenario::or_else): yields
    /// `Ok(value)` or `Err(error)` and never raises itself.
    pub fn attempt(self) -> Scenario<Result<T>> {
        let wrapped = self.map(Ok::<T, BotError>);
        Scenario::from_node(Node::Handle {
            inner: Box::new(wrapped.node),
            recover: Arc::new(|error| lift(Box::new(Err::<T, BotError>(error)))),
        })
    }

    /// Drives the scenario over `updates` until it completes, falls through,
    /// or fails. Bind chains are evaluated iteratively on an explicit frame
    /// stack, so arbitrarily long conversations cannot overflow the host
    /// stack.
    pub async fn run<S>(self, mut updates: S) -> Outcome<T>
    where
        S: Stream<Item = Update> + Send + Unpin,
    {
        enum Step {
            Value(AnyValue),
            Error(BotError),
        }

        let mut node = self.node;
        let mut frames: Vec<Frame> = Vec::new();

        loop {
            let step = match node {
                Node::Pure(thunk) => Step::Value(thunk()),
                Node::Done => return Outcome::FellThrough,
                Node::Raise(error) => Step::Error(error),
                Node::Eval(effect) => match effect().await {
                    Ok(value) => Step::Value(value),
                    Err(error) => Step::Error(error),
                },
                Node::Expect { mode, project } => {
                    let matched = match mode {
                        Wait::NextOnly => match updates.next().await {
                            Some(update) => project(&update),
                            None => None,
                        },
                        Wait::FirstMatch => {
                            let mut found = None;
                            while let Some(update) = updates.next().await {
                                if let Some(value) = project(&update) {
                                    found = Some(value);
                                    break;
                                }
                            }
                            found
                        }
                    };
                    match matched {
                        Some(value) => Step::Value(value),
                        None => return Outcome::FellThrough,
                    }
                }
                Node::Bind { inner, cont } => {
                    frames.push(Frame::Bind(cont));
                    node = *inner;
                    continue;
                }
                Node::Handle { inner, recover } => {
                    frames.push(Frame::Handle(recover));
                    node = *inner;
                    continue;
                }
            };

            node = match step {
                // A value skips error handlers and feeds the nearest bind;
                // with no frames left the scenario is complete.
                Step::Value(value) => loop {
                    match frames.pop() {
                        Some(Frame::Bind(cont)) => break cont(value),
                        Some(Frame::Handle(_)) => continue,
                        None => {
                            return match value.downcast::<T>() {
                                Ok(value) => Outcome::Completed(*value),
                                Err(_) => Outcome::Failed(mismatch_error()),
                            }
                        }
                    }
                },
                // An error skips binds and feeds the nearest handler; with
                // no handler left the scenario fails.
                Step::Error(error) => loop {
                    match frames.pop() {
                        Some(Frame::Handle(recover)) => break recover(error),
                        Some(Frame::Bind(_)) => continue,
                        None => return Outcome::Failed(error),
                    }
                },
            };
        }
    }
}

fn mismatch_error() -> BotError {
    BotError::Scenario("scenario continuation received a value of an unexpected type".to_string())
}

fn type_mismatch() -> Node {
    Node::Raise(mismatch_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::types::{Chat, Message};
    use futures::stream;

    fn text_update(chat_id: i64, text: &str) -> Update {
        Update::Message {
            update_id: 0,
            message: Message {
                message_id: 0,
                from: None,
                chat: Chat { id: chat_id },
                date: 0,
                text: Some(text.to_string()),
            },
        }
    }

    fn callback_update() -> Update {
        Update::CallbackQuery {
            update_id: 0,
            query: crate::types::CallbackQuery {
                id: "q".to_string(),
                from: crate::types::User {
                    id: 1,
                    is_bot: false,
                    first_name: "U".to_string(),
                    last_name: None,
                    username: None,
                },
                message: None,
                data: None,
            },
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, entry: impl Into<String>) -> Scenario<()> {
        let log = log.clone();
        let entry = entry.into();
        Scenario::eval(move || {
            let log = log.clone();
            let entry = entry.clone();
            async move {
                log.lock().unwrap().push(entry);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_pure_completes_without_consuming() {
        let outcome = Scenario::pure(5).run(stream::iter(Vec::new())).await;
        assert_eq!(outcome, Outcome::Completed(5));
    }

    #[tokio::test]
    async fn test_left_identity_law() {
        // bind(pure(a), k) must behave as k(a)
        let k = |v: i32| Scenario::pure(v * 2);
        let bound = Scenario::pure(21).and_then(k);
        let direct = k(21);

        assert_eq!(
            bound.run(stream::iter(Vec::new())).await,
            direct.run(stream::iter(Vec::new())).await
        );
    }

    #[tokio::test]
    async fn test_right_identity_law() {
        let scenario = Scenario::start(expect::text());
        let bound = scenario.clone().and_then(Scenario::pure);
        let inputs = vec![callback_update(), text_update(1, "x")];

        assert_eq!(
            bound.run(stream::iter(inputs.clone())).await,
            scenario.run(stream::iter(inputs)).await
        );
    }

    #[tokio::test]
    async fn test_associativity_law() {
        let f = |v: i32| Scenario::pure(v + 1);
        let g = |v: i32| Scenario::pure(v * 3);
        let left = Scenario::pure(4).and_then(f).and_then(g);
        let right = Scenario::pure(4).and_then(move |a| f(a).and_then(g));

        assert_eq!(
            left.run(stream::iter(Vec::new())).await,
            right.run(stream::iter(Vec::new())).await
        );
    }

    #[tokio::test]
    async fn test_handler_catches_raise() {
        // handleErrorWith(raise(e), r) must behave as r(e)
        let scenario = Scenario::<String>::raise(BotError::Scenario("boom".to_string()))
            .or_else(|error| Scenario::pure(format!("caught {}", error)));

        let outcome = scenario.run(stream::iter(Vec::new())).await;
        assert_eq!(
            outcome,
            Outcome::Completed("caught Scenario error: boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_handler_leaves_values_alone() {
        // handleErrorWith(pure(a), r) must behave as pure(a)
        let scenario =
            Scenario::pure(7).or_else(|_| Scenario::pure(0));
        assert_eq!(
            scenario.run(stream::iter(Vec::new())).await,
            Outcome::Completed(7)
        );
    }

    #[tokio::test]
    async fn test_fall_through_runs_no_effects() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let scenario = Scenario::start(expect::command("hi"))
            .and_then({
                let log = log.clone();
                move |_| record(&log, "greeted")
            });

        let outcome = scenario
            .run(stream::iter(vec![
                text_update(1, "hello"),
                text_update(1, "/other"),
            ]))
            .await;

        assert_eq!(outcome, Outcome::FellThrough);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_next_mismatch_falls_through() {
        let scenario = Scenario::next(expect::plain_text());
        let outcome = scenario
            .run(stream::iter(vec![text_update(1, "/cmd")]))
            .await;
        assert_eq!(outcome, Outcome::FellThrough);
    }

    #[tokio::test]
    async fn test_next_consumes_any_update_kind() {
        // A callback query still ends the wait of a text expectation.
        let scenario = Scenario::next(expect::text());
        let outcome = scenario
            .run(stream::iter(vec![callback_update(), text_update(1, "x")]))
            .await;
        assert_eq!(outcome, Outcome::FellThrough);
    }

    #[tokio::test]
    async fn test_start_feeds_rest_of_stream_to_next() {
        // `next` must see the update immediately following the one `start`
        // matched.
        let scenario = Scenario::start(expect::command("hi"))
            .and_then(|_| Scenario::next(expect::text()));

        let outcome = scenario
            .run(stream::iter(vec![
                text_update(1, "noise"),
                text_update(1, "/hi"),
                text_update(1, "Alice"),
                text_update(1, "Bob"),
            ]))
            .await;

        assert_eq!(outcome, Outcome::Completed("Alice".to_string()));
    }

    #[tokio::test]
    async fn test_eval_error_raises_and_terminates_instance() {
        let scenario: Scenario<()> =
            Scenario::eval(|| async { Err(BotError::Scenario("rpc down".to_string())) });
        let outcome = scenario.run(stream::iter(Vec::new())).await;
        assert_eq!(
            outcome,
            Outcome::Failed(BotError::Scenario("rpc down".to_string()))
        );
    }

    #[tokio::test]
    async fn test_attempt_never_raises() {
        let failing = Scenario::<i32>::raise(BotError::Scenario("nope".to_string()));
        let outcome = failing.attempt().run(stream::iter(Vec::new())).await;
        assert_eq!(
            outcome,
            Outcome::Completed(Err(BotError::Scenario("nope".to_string())))
        );

        let fine = Scenario::pure(3).attempt();
        assert_eq!(
            fine.run(stream::iter(Vec::new())).await,
            Outcome::Completed(Ok(3))
        );
    }

    #[tokio::test]
    async fn test_done_is_not_catchable() {
        let scenario = Scenario::<i32>::done().or_else(|_| Scenario::pure(1));
        assert_eq!(
            scenario.run(stream::iter(Vec::new())).await,
            Outcome::FellThrough
        );
    }

    #[tokio::test]
    async fn test_effects_run_in_sequence() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let scenario = record(&log, "one")
            .and_then({
                let log = log.clone();
                move |_| record(&log, "two")
            })
            .and_then({
                let log = log.clone();
                move |_| record(&log, "three")
            });

        let outcome = scenario.run(stream::iter(Vec::new())).await;
        assert_eq!(outcome, Outcome::Completed(()));
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["one".to_string(), "two".to_string(), "three".to_string()]
        );
    }

    #[tokio::test]
    async fn test_long_bind_chain_is_stack_safe() {
        let mut scenario = Scenario::pure(0i64);
        for _ in 0..50_000 {
            scenario = scenario.and_then(|v| Scenario::pure(v + 1));
        }
        assert_eq!(
            scenario.run(stream::iter(Vec::new())).await,
            Outcome::Completed(50_000)
        );
    }

    #[tokio::test]
    async fn test_clones_run_independently() {
        let scenario = Scenario::start(expect::text());
        let first = scenario.clone();
        let second = scenario;

        assert_eq!(
            first.run(stream::iter(vec![text_update(1, "a")])).await,
            Outcome::Completed("a".to_string())
        );
        assert_eq!(
            second.run(stream::iter(vec![text_update(2, "b")])).await,
            Outcome::Completed("b".to_string())
        );
    }

    #[tokio::test]
    async fn test_completion_leaves_remaining_updates_unconsumed() {
        let scenario = Scenario::next(expect::text());
        let outcome = scenario
            .run(stream::iter(vec![
                text_update(1, "first"),
                text_update(1, "second"),
            ]))
            .await;
        assert_eq!(outcome, Outcome::Completed("first".to_string()));
    }
}
