use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Views whose cached rendering is stale after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewInvalidation {
    pub views: Vec<String>,
}

/// Publishes view invalidations to whoever caches rendered pages.
#[derive(Clone)]
pub struct Revalidator {
    tx: broadcast::Sender<ViewInvalidation>,
}

impl Revalidator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewInvalidation> {
        self.tx.subscribe()
    }

    pub fn views<I, S>(&self, views: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let views: Vec<String> = views.into_iter().map(Into::into).collect();
        tracing::debug!(?views, "revalidate");
        // No subscribers is fine.
        let _ = self.tx.send(ViewInvalidation { views });
    }
}

impl Default for Revalidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_invalidations() {
        let revalidator = Revalidator::new();
        let mut rx = revalidator.subscribe();
        revalidator.views(["/products", "/admin/products"]);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.views, vec!["/products", "/admin/products"]);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        Revalidator::new().views(["/products"]);
    }
}
