use anyhow::{Context, Result};
use log::debug;

use crate::link::{ServerEvent, ServerLink};

const WINDOW_TITLE: &str = "xcb-window";

pub struct Session<L: ServerLink> {
    link: L,
    width: u16,
    height: u16,
    close_atom: Option<u32>,
    should_close: bool,
}

impl<L: ServerLink> Session<L> {
    pub fn new(link: L, width: u16, height: u16) -> Session<L> {
        Session {
            link,
            width,
            height,
            close_atom: None,
            should_close: false,
        }
    }

    /// Create, map and name the window, then opt into the close protocol.
    pub fn init(&mut self) -> Result<()> {
        self.setup_window()?;
        self.negotiate_close()?;
        Ok(())
    }

    fn setup_window(&mut self) -> Result<()> {
        self.link
            .create_window(self.width, self.height)
            .context("failed to create window")?;
        self.link.map_window().context("failed to map window")?;
        self.link
            .set_title(WINDOW_TITLE)
            .context("failed to name window")?;
        Ok(())
    }

    fn negotiate_close(&mut self) -> Result<()> {
        let protocols = self
            .link
            .intern_atom(true, b"WM_PROTOCOLS")
            .context("failed to get WM_PROTOCOLS")?;
        let delete = self
            .link
            .intern_atom(false, b"WM_DELETE_WINDOW")
            .context("failed to get WM_DELETE_WINDOW")?;
        self.link
            .advertise_close(protocols, delete)
            .context("failed to opt into the close protocol")?;

        debug!("close atom is {}", delete);

        self.close_atom = Some(delete);
        Ok(())
    }

    /// Drain everything the server has queued; returns without blocking
    /// once the queue is empty.
    pub fn pump(&mut self) -> Result<()> {
        while let Some(event) = self.link.poll_event()? {
            match event {
                ServerEvent::Protocol(atom) if Some(atom) == self.close_atom => {
                    debug!("close requested by the window manager");
                    self.should_close = true;
                }
                ServerEvent::Protocol(atom) => {
                    debug!("ignoring client message for atom {}", atom);
                }
                ServerEvent::Other => {}
            }
        }
        Ok(())
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }
}

/// The whole program: connect, set up, spin on the event queue until the
/// window manager asks us to close, tear down.
pub fn run<L, F>(connect: F, width: u16, height: u16) -> Result<()>
where
    L: ServerLink,
    F: FnOnce() -> Result<L>,
{
    let link = connect().context("failed to connect to the X server")?;

    let mut session = Session::new(link, width, height);
    session.init().context("init failed")?;

    println!("init done");

    while !session.should_close() {
        session.pump()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::*;
    use crate::error::{Error, WireError};

    #[derive(Default)]
    struct FakeLink {
        log: Rc<RefCell<Vec<String>>>,
        events: Rc<RefCell<VecDeque<ServerEvent>>>,
        fail_create: Option<WireError>,
        fail_map: Option<WireError>,
        window: bool,
    }

    impl ServerLink for FakeLink {
        fn create_window(&mut self, width: u16, height: u16) -> Result<(), Error> {
            self.log.borrow_mut().push(format!("create {width}x{height}"));
            if let Some(err) = self.fail_create {
                return Err(Error::Wire(err));
            }
            self.window = true;
            Ok(())
        }

        fn map_window(&mut self) -> Result<(), Error> {
            self.log.borrow_mut().push("map".into());
            if let Some(err) = self.fail_map {
                return Err(Error::Wire(err));
            }
            Ok(())
        }

        fn set_title(&mut self, title: &str) -> Result<(), Error> {
            self.log.borrow_mut().push(format!("title {title}"));
            Ok(())
        }

        fn intern_atom(&mut self, only_if_exists: bool, name: &[u8]) -> Result<u32, Error> {
            let name = String::from_utf8_lossy(name).into_owned();
            self.log
                .borrow_mut()
                .push(format!("intern {name} only_if_exists={only_if_exists}"));
            match name.as_str() {
                "WM_PROTOCOLS" => Ok(100),
                "WM_DELETE_WINDOW" => Ok(200),
                _ => Err(Error::Wire(WireError::Value { code: 5, major: 16, minor: 0 })),
            }
        }

        fn advertise_close(&mut self, protocols: u32, delete: u32) -> Result<(), Error> {
            self.log
                .borrow_mut()
                .push(format!("advertise protocols={protocols} delete={delete}"));
            Ok(())
        }

        fn poll_event(&mut self) -> Result<Option<ServerEvent>, Error> {
            self.log.borrow_mut().push("poll".into());
            Ok(self.events.borrow_mut().pop_front())
        }
    }

    impl Drop for FakeLink {
        fn drop(&mut self) {
            if self.window {
                self.log.borrow_mut().push("destroy".into());
            }
            self.log.borrow_mut().push("disconnect".into());
        }
    }

    fn logged(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
        log.borrow().clone()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn failed_connect_aborts_startup() {
        let result = run::<FakeLink, _>(|| Err(anyhow!("no display")), 300, 300);
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("failed to connect to the X server"));
    }

    #[test]
    fn create_failure_short_circuits_setup() {
        let fake = FakeLink {
            fail_create: Some(WireError::Value { code: 2, major: 1, minor: 0 }),
            fail_map: None,
            log: Default::default(),
            events: Default::default(),
            window: false,
        };
        let log = Rc::clone(&fake.log);

        let mut session = Session::new(fake, 300, 300);
        assert!(session.init().is_err());
        drop(session);

        // map and title were never issued, and there was no window to destroy
        assert_eq!(logged(&log), strings(&["create 300x300", "disconnect"]));
    }

    #[test]
    fn map_failure_aborts_before_naming() {
        let fake = FakeLink {
            fail_map: Some(WireError::Request { code: 8, major: 8, minor: 0 }),
            fail_create: None,
            log: Default::default(),
            events: Default::default(),
            window: false,
        };
        let log = Rc::clone(&fake.log);

        let mut session = Session::new(fake, 300, 300);
        assert!(session.init().is_err());
        drop(session);

        assert_eq!(
            logged(&log),
            strings(&["create 300x300", "map", "destroy", "disconnect"])
        );
    }

    #[test]
    fn close_flag_sticks_once_set() {
        let fake = FakeLink::default();
        let events = Rc::clone(&fake.events);

        let mut session = Session::new(fake, 300, 300);
        session.init().unwrap();

        events.borrow_mut().extend([
            ServerEvent::Protocol(200),
            ServerEvent::Other,
            ServerEvent::Protocol(17),
        ]);
        session.pump().unwrap();
        assert!(session.should_close());
        // the batch behind the matching message still drained
        assert!(events.borrow().is_empty());

        events.borrow_mut().push_back(ServerEvent::Protocol(17));
        session.pump().unwrap();
        assert!(session.should_close());
    }

    #[test]
    fn only_the_delete_atom_sets_the_close_flag() {
        let fake = FakeLink::default();
        let events = Rc::clone(&fake.events);

        let mut session = Session::new(fake, 300, 300);
        session.init().unwrap();

        events.borrow_mut().push_back(ServerEvent::Protocol(199));
        session.pump().unwrap();
        assert!(!session.should_close());

        events.borrow_mut().push_back(ServerEvent::Protocol(200));
        session.pump().unwrap();
        assert!(session.should_close());
    }

    #[test]
    fn pump_drains_every_queued_event() {
        let fake = FakeLink::default();
        let log = Rc::clone(&fake.log);
        let events = Rc::clone(&fake.events);
        events.borrow_mut().extend([
            ServerEvent::Other,
            ServerEvent::Protocol(42),
            ServerEvent::Other,
        ]);

        let mut session = Session::new(fake, 300, 300);
        session.pump().unwrap();

        assert!(events.borrow().is_empty());
        let polls = log.borrow().iter().filter(|c| c.as_str() == "poll").count();
        assert_eq!(polls, 4);
        assert!(!session.should_close());
    }

    #[test]
    fn teardown_without_init_is_safe() {
        let fake = FakeLink::default();
        let log = Rc::clone(&fake.log);

        drop(Session::new(fake, 300, 300));

        assert_eq!(logged(&log), strings(&["disconnect"]));
    }

    #[test]
    fn lifecycle_against_scripted_server() {
        let fake = FakeLink::default();
        let log = Rc::clone(&fake.log);
        fake.events.borrow_mut().push_back(ServerEvent::Protocol(200));

        run(move || Ok(fake), 300, 300).unwrap();

        assert_eq!(
            logged(&log),
            strings(&[
                "create 300x300",
                "map",
                "title xcb-window",
                "intern WM_PROTOCOLS only_if_exists=true",
                "intern WM_DELETE_WINDOW only_if_exists=false",
                "advertise protocols=100 delete=200",
                "poll",
                "poll",
                "destroy",
                "disconnect",
            ])
        );
    }
}
