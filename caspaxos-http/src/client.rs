//! HTTP client implementing the core [`Acceptor`] trait against a remote
//! acceptor's wire API.

use caspaxos::{Acceptor, AcceptorError, Ballot, Prepared, TransportError, Value};
use error_stack::Report;
use percent_encoding::{NON_ALPHANUMERIC, percent_encode};
use reqwest::StatusCode;
use url::Url;

use crate::BALLOT_HEADER;

/// A remote acceptor. `address()` is the base URL, which doubles as the
/// stable identity for quorum-set membership.
#[derive(Clone, Debug)]
pub struct HttpAcceptor {
    url: Url,
    address: String,
    client: reqwest::Client,
}

impl HttpAcceptor {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Use a shared client, e.g. one carrying connect/read timeouts. The
    /// timeouts bound each RPC; the overall proposal deadline stays with the
    /// caller's cancellation token.
    #[must_use]
    pub fn with_client(url: Url, client: reqwest::Client) -> Self {
        let address = url.to_string();
        Self {
            url,
            address,
            client,
        }
    }

    /// Join path-escaped segments onto the base URL. Segments are raw bytes
    /// (values are not necessarily UTF-8) and each is encoded exactly once.
    fn endpoint(&self, segments: &[&[u8]]) -> Url {
        let mut path = self.url.path().trim_end_matches('/').to_owned();
        for segment in segments {
            path.push('/');
            path.push_str(&percent_encode(segment, NON_ALPHANUMERIC).to_string());
        }
        let mut url = self.url.clone();
        url.set_path(&path);
        url
    }
}

fn transport(err: reqwest::Error, operation: &'static str) -> AcceptorError {
    AcceptorError::Transport(
        Report::new(err)
            .change_context(TransportError)
            .attach_printable(operation),
    )
}

impl Acceptor for HttpAcceptor {
    fn address(&self) -> &str {
        &self.address
    }

    async fn prepare(&self, key: &str, ballot: Ballot) -> Result<Prepared, AcceptorError> {
        let url = self.endpoint(&[b"prepare", key.as_bytes()]);
        let response = self
            .client
            .post(url)
            .header(BALLOT_HEADER, ballot.to_string())
            .send()
            .await
            .map_err(|err| transport(err, "sending prepare request"))?;

        // The response ballot is mandatory in both directions: on success it
        // is the ballot the value was accepted under, on conflict the ballot
        // to fast-forward past.
        let current: Option<Ballot> = response
            .headers()
            .get(BALLOT_HEADER)
            .and_then(|raw| raw.to_str().ok())
            .and_then(|raw| raw.parse().ok());
        let missing_ballot = || {
            AcceptorError::Transport(
                Report::new(TransportError)
                    .attach_printable("prepare response is missing a valid ballot header"),
            )
        };

        match response.status() {
            StatusCode::OK => {
                let accepted = current.ok_or_else(missing_ballot)?;
                let value = response
                    .bytes()
                    .await
                    .map_err(|err| transport(err, "reading prepare response value"))?;
                Ok(Prepared { value, accepted })
            }
            StatusCode::PRECONDITION_FAILED => {
                let current = current.ok_or_else(missing_ballot)?;
                Err(AcceptorError::PrepareConflict { current })
            }
            status => Err(AcceptorError::Transport(
                Report::new(TransportError)
                    .attach_printable(format!("prepare returned unexpected status {status}")),
            )),
        }
    }

    async fn accept(&self, key: &str, ballot: Ballot, value: Value) -> Result<(), AcceptorError> {
        let url = if value.is_empty() {
            self.endpoint(&[b"accept", key.as_bytes()])
        } else {
            self.endpoint(&[b"accept", key.as_bytes(), &value[..]])
        };

        let response = self
            .client
            .post(url)
            .header(BALLOT_HEADER, ballot.to_string())
            .send()
            .await
            .map_err(|err| transport(err, "sending accept request"))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_ACCEPTABLE => Err(AcceptorError::AcceptConflict { current: None }),
            status => Err(AcceptorError::Transport(
                Report::new(TransportError)
                    .attach_printable(format!("accept returned unexpected status {status}")),
            )),
        }
    }
}
