use crate::app_state::State;
use crate::scene::FieldParams;

/// Commands the host (native shell or web page) can push into the running
/// field, delivered through the event-loop proxy.
#[derive(Debug)]
pub enum UserCommand {
    /// Override the constrained-display policy (6 networks instead of 8)
    /// and regenerate.
    SetConstrainedDisplay(bool),
    /// Replace the generation parameters wholesale and regenerate.
    SetFieldParams(FieldParams),
    /// Regenerate the field with the current parameters.
    Rebuild,
    /// Notifies App that State setup is complete.
    StateInitialized,
}

impl State {
    pub fn process_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::SetConstrainedDisplay(constrained) => {
                log::info!("Constrained display override: {}", constrained);
                self.constrained_override = Some(constrained);
                self.rebuild_scene();
            }
            UserCommand::SetFieldParams(params) => {
                log::info!("Replacing field parameters: {:?}", params);
                self.params = params;
                self.rebuild_scene();
            }
            UserCommand::Rebuild => {
                self.rebuild_scene();
            }
            UserCommand::StateInitialized => {
                // Handled in App::user_event.
            }
        }
    }
}
