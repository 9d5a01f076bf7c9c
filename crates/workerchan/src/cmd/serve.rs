use serde_json::Value;
use tracing::{debug, info, warn};
use workerchan_channel::{Channel, ChannelConfig, ChannelError, Message, Request, RequestError};

use crate::cmd::ServeArgs;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

/// Method answered with a generic failure; the request data is the reason.
const FAIL_METHOD: &str = "fail";

pub fn run(args: ServeArgs) -> CliResult<i32> {
    if args.inbound_fd == args.outbound_fd {
        return Err(CliError::new(
            USAGE,
            format!(
                "inbound and outbound descriptors must differ (both {})",
                args.inbound_fd
            ),
        ));
    }

    let config = ChannelConfig {
        read_chunk_size: args.chunk_size,
        max_payload_size: args.max_payload,
        ..ChannelConfig::default()
    };
    // SAFETY: the descriptors are inherited from the controller, distinct, and
    // not otherwise used by this process; the channel takes ownership.
    let channel = unsafe { Channel::from_raw_fds(args.inbound_fd, args.outbound_fd, config) };

    install_ctrlc_handler(channel.clone())?;

    channel
        .connect()
        .map_err(|err| channel_error("connect failed", err))?;

    let target_id = args
        .target_id
        .unwrap_or_else(|| std::process::id().to_string());
    channel
        .try_notify(&target_id, "running", None)
        .map_err(|err| channel_error("running notification failed", err))?;
    info!(target_id = %target_id, "worker running");

    let result = serve_loop(&channel);
    channel.close();
    result.map(|()| SUCCESS)
}

fn serve_loop(channel: &Channel) -> CliResult<()> {
    loop {
        match channel.receive() {
            Ok(Some(Message::Request(request))) => match answer(&request) {
                Ok(()) => {}
                Err(ChannelError::Closed) => return Ok(()),
                Err(err) => return Err(channel_error("response failed", err)),
            },
            Ok(Some(Message::Notification(notification))) => {
                info!(
                    event = notification.event(),
                    data = ?notification.data(),
                    "notification"
                );
            }
            Ok(None) => {}
            Err(ChannelError::Closed) => {
                debug!("channel closed");
                return Ok(());
            }
            Err(err) => return Err(channel_error("receive failed", err)),
        }
    }
}

// A response that cannot be sent but leaves the channel usable is replaced
// by a failure response; if that cannot be sent either, the request goes
// unanswered.
fn answer(request: &Request) -> Result<(), ChannelError> {
    match request.respond(handle_request(request)) {
        Err(err) if !err.is_fatal() => {
            warn!(id = request.id(), error = %err, "response not sent");
            match request.failed(&RequestError::generic(err.to_string())) {
                Err(err) if !err.is_fatal() => {
                    warn!(id = request.id(), error = %err, "failure response not sent");
                    Ok(())
                }
                other => other,
            }
        }
        other => other,
    }
}

fn handle_request(request: &Request) -> Result<Option<Value>, RequestError> {
    debug!(id = request.id(), method = request.method(), "request");
    if request.method() == FAIL_METHOD {
        let reason = request
            .data_as::<Option<String>>()?
            .unwrap_or_else(|| "request failed".to_string());
        return Err(RequestError::generic(reason));
    }
    Ok(request.data().cloned())
}

fn install_ctrlc_handler(channel: Channel) -> CliResult<()> {
    ctrlc::set_handler(move || {
        channel.close();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
