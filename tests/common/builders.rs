//! Test node builders

use super::CallLog;
use capflow::{args, component, pipeline, Field, FieldType, Kwargs, Node};

/// Builder for a single-`n` component that logs `name(n)` when it runs
pub struct LeafBuilder {
    name: String,
    log: CallLog,
    fail_on: Option<i64>,
    is_async: bool,
}

impl LeafBuilder {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            fail_on: None,
            is_async: false,
        }
    }

    /// Make the body fail for this `n`
    pub fn fail_on(mut self, n: i64) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn async_body(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn build(self) -> Node {
        let builder = component(self.name.as_str()).param(Field::new("n", FieldType::Int));
        let name = self.name;
        let log = self.log;
        let fail_on = self.fail_on;
        let run = move |kw: &Kwargs| -> anyhow::Result<()> {
            let n = kw.get::<i64>("n")?;
            if Some(n) == fail_on {
                anyhow::bail!("{} refused n={}", name, n);
            }
            log.push(format!("{}({})", name, n));
            Ok(())
        };
        if self.is_async {
            builder
                .body_async(move |kw: Kwargs| {
                    let run = run.clone();
                    async move {
                        tokio::task::yield_now().await;
                        run(&kw)
                    }
                })
                .unwrap()
        } else {
            builder.body(run).unwrap()
        }
    }
}

/// The scaling graph used across the capture tests:
///
/// ```text
/// M(n) -> P(n * 10)
/// P(n) -> L(n * 2), L(n * 3)
/// ```
pub struct ScalingGraph {
    pub log: CallLog,
    pub leaf: Node,
    pub pair: Node,
    pub outer: Node,
}

impl ScalingGraph {
    pub fn new() -> Self {
        let log = CallLog::new();
        let leaf = LeafBuilder::new("L", &log).build();
        Self::with_leaf(log, leaf)
    }

    pub fn with_leaf(log: CallLog, leaf: Node) -> Self {
        let pair = {
            let leaf = leaf.clone();
            let log = log.clone();
            pipeline("P")
                .param(Field::new("n", FieldType::Int))
                .body(move |kw: &Kwargs| {
                    let n = kw.get::<i64>("n")?;
                    log.push(format!("P({})", n));
                    leaf.call(args![n * 2])?;
                    leaf.call(args![n * 3])?;
                    Ok(())
                })
                .unwrap()
        };
        let outer = {
            let pair = pair.clone();
            pipeline("M")
                .param(Field::new("n", FieldType::Int))
                .body(move |kw: &Kwargs| {
                    let n = kw.get::<i64>("n")?;
                    pair.call(args![n * 10])?;
                    Ok(())
                })
                .unwrap()
        };
        Self {
            log,
            leaf,
            pair,
            outer,
        }
    }

    /// Same shape, with async pipeline bodies that yield between calls
    pub fn new_async() -> Self {
        let log = CallLog::new();
        let leaf = LeafBuilder::new("L", &log).async_body().build();
        let pair = {
            let leaf = leaf.clone();
            let log = log.clone();
            pipeline("P")
                .param(Field::new("n", FieldType::Int))
                .body_async(move |kw: Kwargs| {
                    let leaf = leaf.clone();
                    let log = log.clone();
                    async move {
                        let n = kw.get::<i64>("n")?;
                        log.push(format!("P({})", n));
                        leaf.call_async(args![n * 2]).await?;
                        tokio::task::yield_now().await;
                        leaf.call_async(args![n * 3]).await?;
                        Ok::<(), anyhow::Error>(())
                    }
                })
                .unwrap()
        };
        let outer = {
            let pair = pair.clone();
            pipeline("M")
                .param(Field::new("n", FieldType::Int))
                .body_async(move |kw: Kwargs| {
                    let pair = pair.clone();
                    async move {
                        let n = kw.get::<i64>("n")?;
                        pair.call_async(args![n * 10]).await?;
                        Ok::<(), anyhow::Error>(())
                    }
                })
                .unwrap()
        };
        Self {
            log,
            leaf,
            pair,
            outer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_builder() {
        let log = CallLog::new();
        let leaf = LeafBuilder::new("X", &log).fail_on(2).build();
        leaf.call(args![1]).unwrap();
        assert!(leaf.call(args![2]).is_err());
        assert_eq!(log.entries(), ["X(1)"]);
    }
}
