use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ctp_frame::{FrameError, Message};
use ctp_session::{Session, SessionConfig, SessionError, SessionListener};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        response_timeout: parse_duration(&args.idle_timeout)?,
        ..SessionConfig::default()
    };
    let listener = SessionListener::bind(&args.addr)
        .map_err(|err| session_error("bind failed", err))?
        .with_config(config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    serve(&listener, &args, format, &running)
}

fn serve(
    listener: &SessionListener,
    args: &ListenArgs,
    format: OutputFormat,
    running: &AtomicBool,
) -> CliResult<i32> {
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let accepted = listener
            .try_accept()
            .map_err(|err| session_error("accept failed", err))?;
        let Some(mut session) = accepted else {
            thread::sleep(ACCEPT_POLL_INTERVAL);
            continue;
        };
        debug!(peer = ?session.peer_addr(), "client connected");

        while running.load(Ordering::SeqCst) {
            let message = match session.receive_response() {
                Ok(message) => message,
                Err(err) => {
                    log_drop(&session, &err);
                    break;
                }
            };

            print_message(&message, session.peer_addr(), format);
            printed = printed.saturating_add(1);

            if let Err(err) = answer(&mut session, &message, args) {
                warn!(peer = ?session.peer_addr(), error = %err, "reply failed");
                break;
            }

            if let Some(count) = args.count {
                if printed >= count {
                    session.disconnect();
                    return Ok(SUCCESS);
                }
            }
        }
        session.disconnect();
    }

    Ok(SUCCESS)
}

fn answer(session: &mut Session, message: &Message, args: &ListenArgs) -> Result<(), SessionError> {
    if args.echo {
        return session.send_message(&message.topic, &message.payload);
    }
    if let Some(reply) = &args.reply {
        let topic = args.reply_topic.as_deref().unwrap_or(&message.topic);
        return session.send_message(topic, reply);
    }
    Ok(())
}

fn log_drop(session: &Session, err: &SessionError) {
    let peer = session.peer_addr();
    match err {
        SessionError::Frame(FrameError::BadPrefix { received: 0, .. }) => {
            debug!(?peer, "client closed connection")
        }
        SessionError::Timeout(idle) => info!(?peer, ?idle, "dropping idle client"),
        other => warn!(?peer, error = %other, "dropping client after bad frame"),
    }
}

// First Ctrl-C stops the accept loop, or ends a connected client's session
// once its pending read returns. A second one exits at once.
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
