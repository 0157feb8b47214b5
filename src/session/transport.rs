use crate::coordinator::Coordinator;

/// Commands an OS surface can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    PlayPause,
    SkipNext,
    SkipPrevious,
    Stop,
    /// Play the browse item with this id.
    PlayItem(String),
    /// The host is going away (task removed, MPRIS `Quit`).
    Quit,
}

/// Receiver of transport commands.
pub trait TransportTarget: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn toggle_play_pause(&self);
    fn skip_next(&self);
    fn skip_previous(&self);
    fn stop(&self);
    fn play_item(&self, id: &str);
}

/// Forward `cmd` to `target`. `Quit` belongs to the adapter and is ignored.
pub fn dispatch(target: &dyn TransportTarget, cmd: &TransportCommand) {
    match cmd {
        TransportCommand::Play => target.play(),
        TransportCommand::Pause => target.pause(),
        TransportCommand::PlayPause => target.toggle_play_pause(),
        TransportCommand::SkipNext => target.skip_next(),
        TransportCommand::SkipPrevious => target.skip_previous(),
        TransportCommand::Stop => target.stop(),
        TransportCommand::PlayItem(id) => target.play_item(id),
        TransportCommand::Quit => {}
    }
}

impl TransportTarget for Coordinator {
    fn play(&self) {
        self.resume();
    }

    fn pause(&self) {
        Coordinator::pause(self);
    }

    fn toggle_play_pause(&self) {
        Coordinator::toggle_play_pause(self);
    }

    fn skip_next(&self) {
        self.play_next();
    }

    fn skip_previous(&self) {
        self.play_previous();
    }

    fn stop(&self) {
        Coordinator::stop(self);
    }

    fn play_item(&self, id: &str) {
        match self.find(id) {
            Some(track) => Coordinator::play(self, &track),
            None => log::debug!("no track with id {id}"),
        }
    }
}
