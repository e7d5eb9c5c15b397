use tokio_util::sync::CancellationToken;

/// A token cancelled on Ctrl-C. Runners check it between episodes.
pub fn setup_cancel_token() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", err);
                return;
            }
            tracing::warn!("Ctrl-C received, stopping after the current episode");
            cancel_token.cancel();
        }
    });
    cancel_token
}
