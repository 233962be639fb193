//! Generated gRPC client/server code for the block-server wire contract.

#[allow(
    clippy::doc_markdown,
    clippy::missing_const_for_fn,
    clippy::trivially_copy_pass_by_ref
)]
pub mod block {
    tonic::include_proto!("raid.v1");
}

#[cfg(test)]
mod tests {
    use super::block;

    #[test]
    fn get_response_defaults_to_no_outcome() {
        let resp = block::GetResponse::default();
        assert!(resp.outcome.is_none());
    }

    #[test]
    fn put_response_defaults_to_not_ok() {
        let resp = block::PutResponse::default();
        assert!(!resp.ok);
    }
}
