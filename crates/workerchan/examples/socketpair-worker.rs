//! A worker loop driven by an in-process controller over two socket pairs.

use std::io::Write;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::thread;

use workerchan::frame::{encode, FrameReader};
use workerchan::{Channel, ChannelError, Message, RequestError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (worker_in, mut to_worker) = UnixStream::pair()?;
    let (worker_out, from_worker) = UnixStream::pair()?;

    let controller = thread::spawn(move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut from_worker = FrameReader::new(from_worker);
        println!("controller <- {}", String::from_utf8_lossy(&from_worker.read_frame()?));

        to_worker.write_all(&encode(br#"{"method":"add","id":"1","data":[2,3]}"#))?;
        println!("controller <- {}", String::from_utf8_lossy(&from_worker.read_frame()?));

        to_worker.write_all(&encode(br#"{"method":"add","id":"2","data":"nope"}"#))?;
        println!("controller <- {}", String::from_utf8_lossy(&from_worker.read_frame()?));
        Ok(())
    });

    let channel = Channel::new(OwnedFd::from(worker_in), OwnedFd::from(worker_out));
    channel.notify(&std::process::id().to_string(), "running", None);

    loop {
        match channel.receive() {
            Ok(Some(Message::Request(request))) => {
                let outcome = request
                    .data_as::<Vec<i64>>()
                    .map(|terms| Some(terms.iter().sum::<i64>().into()));
                request.respond(outcome)?;
            }
            Ok(Some(Message::Notification(notification))) => {
                println!("worker: notification {}", notification.event());
            }
            Ok(None) => continue,
            Err(ChannelError::Closed) => break,
            Err(err) => return Err(err.into()),
        }
    }

    channel.close();
    controller
        .join()
        .map_err(|_| RequestError::generic("controller thread panicked"))?
        .map_err(|err| err.to_string())?;
    Ok(())
}
