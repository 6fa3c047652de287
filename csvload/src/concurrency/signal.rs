//! One-shot ready signal publishing the insert statement to the workers.
//!
//! The producer derives the statement from the header and publishes it exactly once. Workers
//! block on [`StatementRx::wait`] before pulling any job, so none of them can observe a
//! partially initialized header.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::InsertStatement;

/// Producer side of the ready signal. Publishing consumes it, so it can only happen once.
#[derive(Debug)]
pub struct StatementTx {
    tx: watch::Sender<Option<Arc<InsertStatement>>>,
}

/// Worker side of the ready signal.
#[derive(Debug, Clone)]
pub struct StatementRx {
    rx: watch::Receiver<Option<Arc<InsertStatement>>>,
}

/// Creates an unpublished ready signal.
pub fn create_statement_signal() -> (StatementTx, StatementRx) {
    let (tx, rx) = watch::channel(None);

    (StatementTx { tx }, StatementRx { rx })
}

impl StatementTx {
    /// Publishes the statement to every current and future receiver.
    pub fn publish(self, statement: Arc<InsertStatement>) {
        // Stores the value even when no receiver is subscribed yet.
        self.tx.send_replace(Some(statement));
    }
}

impl StatementRx {
    /// Waits until the statement is published.
    ///
    /// Returns [`None`] when the producer went away without publishing, which happens when
    /// the source ended before a header could be read.
    pub async fn wait(&mut self) -> Option<Arc<InsertStatement>> {
        match self.rx.wait_for(|statement| statement.is_some()).await {
            Ok(statement) => statement.clone(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Header;

    fn statement() -> Arc<InsertStatement> {
        let header = Header::new(vec!["domain".to_string(), "rank".to_string()]).unwrap();
        Arc::new(InsertStatement::new("domain", header))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn receivers_see_the_published_statement() {
        let (tx, rx) = create_statement_signal();

        let waiters = (0..4)
            .map(|_| {
                let mut rx = rx.clone();
                tokio::spawn(async move { rx.wait().await })
            })
            .collect::<Vec<_>>();

        let published = statement();
        tx.publish(published.clone());

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Some(published.clone()));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn late_receivers_see_the_published_statement() {
        let (tx, mut rx) = create_statement_signal();
        tx.publish(statement());

        assert!(rx.wait().await.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_without_publishing_releases_waiters() {
        let (tx, mut rx) = create_statement_signal();
        drop(tx);

        assert_eq!(rx.wait().await, None);
    }
}
