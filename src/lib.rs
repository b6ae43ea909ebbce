use std::sync::{Arc, Mutex};

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window},
};

#[cfg(target_arch = "wasm32")]
use winit::event_loop::EventLoopProxy;

#[cfg(target_arch = "wasm32")]
use once_cell::sync::OnceCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;

pub mod app_state;
pub mod camera;
pub mod color;
pub mod input;
pub mod models;
pub mod scene;
pub mod sim;
pub mod time;
pub mod ui_events;

use app_state::State;
use input::Cursor;
use ui_events::UserCommand;

#[cfg(target_arch = "wasm32")]
use scene::FieldParams;

#[cfg(target_arch = "wasm32")]
static WASM_API_INSTANCE: OnceCell<WasmApi> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
static WASM_READY_FLUME_CHANNEL: OnceCell<(flume::Sender<()>, flume::Receiver<()>)> =
    OnceCell::new();

struct App {
    window: Option<Arc<Window>>,
    state: Arc<Mutex<Option<State>>>, // Wrapped in Arc<Mutex> for interior mutability
    cursor: Cursor,
    #[cfg(target_arch = "wasm32")]
    proxy: Option<EventLoopProxy<UserCommand>>,
}

impl App {
    fn new(#[cfg(target_arch = "wasm32")] event_loop: &EventLoop<UserCommand>) -> Self {
        #[cfg(target_arch = "wasm32")]
        let app_proxy = event_loop.create_proxy();

        #[cfg(target_arch = "wasm32")]
        {
            let wasm_api_instance = WasmApi {
                proxy: app_proxy.clone(),
            };
            if WASM_API_INSTANCE.set(wasm_api_instance).is_err() {
                log::warn!("WASM_API_INSTANCE was already set. This should only happen once.");
            }
        }

        Self {
            window: None,
            state: Arc::new(Mutex::new(None)),
            cursor: Cursor::Default,
            #[cfg(target_arch = "wasm32")]
            proxy: Some(app_proxy),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn get_window_size(&self) -> Option<winit::dpi::PhysicalSize<u32>> {
        self.window.as_ref().map(|w| w.inner_size())
    }

    /// Push the interaction affordance to the platform cursor, skipping
    /// redundant updates on every pointer move.
    fn apply_cursor(&mut self, cursor: Cursor) {
        if cursor == self.cursor {
            return;
        }
        self.cursor = cursor;
        if let Some(window) = self.window.as_ref() {
            let icon = match cursor {
                Cursor::Default => CursorIcon::Default,
                Cursor::Grab => CursorIcon::Grab,
                Cursor::Grabbing => CursorIcon::Grabbing,
            };
            window.set_cursor(icon);
        }
    }
}

impl ApplicationHandler<UserCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let mut window_attributes = Window::default_attributes().with_title("Plexview");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(State::new(window)) {
                Ok(mut state) => {
                    let current_size = self.get_window_size().unwrap();
                    state.resize(current_size.width, current_size.height);
                    self.state.lock().unwrap().replace(state);
                    self.window.as_ref().unwrap().request_redraw();
                }
                Err(e) => {
                    // Nothing to animate without a device; leave the window
                    // blank rather than crash the host.
                    log::error!("Failed to create State: {:?}", e);
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            // Clone Arc<Mutex<Option<State>>> and Arc<Window> for the async task
            let state_arc_for_spawn = self.state.clone();
            let window_for_state_new = window.clone();
            let proxy_for_init_notification =
                self.proxy.as_ref().expect("App proxy not set").clone();

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone()).await {
                    Ok(mut state_instance) => {
                        log::info!("WASM State created in async task.");
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(initial_size.width, initial_size.height);

                        {
                            let mut app_state_guard = state_arc_for_spawn.lock().unwrap();
                            app_state_guard.replace(state_instance);
                        }
                        log::info!("WASM State assigned to App. Sending initialization notification.");
                        if proxy_for_init_notification
                            .send_event(UserCommand::StateInitialized)
                            .is_err()
                        {
                            log::error!("Failed to send StateInitialized event.");
                        }
                    }
                    Err(e) => log::error!("Failed to create State in WASM: {:?}", e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserCommand) {
        match event {
            UserCommand::StateInitialized => {
                log::info!("State initialized and ready.");
                // Signal to the promise resolver
                #[cfg(target_arch = "wasm32")]
                if let Some((sender, _)) = WASM_READY_FLUME_CHANNEL.get() {
                    if let Err(e) = sender.send(()) {
                        log::error!("Failed to send WASM ready signal: {:?}", e);
                    }
                }
                if let Some(w_handle) = self.window.as_ref() {
                    w_handle.request_redraw();
                }
            }
            _ => {
                if let Some(state) = &mut *self.state.lock().unwrap() {
                    state.process_command(event);
                    if let Some(w_handle) = self.window.as_ref() {
                        w_handle.request_redraw();
                    }
                } else {
                    log::warn!(
                        "Received a command before state was initialized (via proxy). Ignoring: {:?}",
                        event
                    );
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let mut cursor_change = None;

        {
            let Some(state) = &mut *self.state.lock().unwrap() else {
                log::warn!("Window event received before State was initialized, ignoring.");
                return;
            };

            let window_handle = self.window.as_ref().unwrap();

            match event {
                WindowEvent::CloseRequested => event_loop.exit(),
                WindowEvent::Resized(size) => {
                    state.resize(size.width, size.height);
                    window_handle.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    state.update();
                    match state.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => {
                            state.resize(state.config.width, state.config.height)
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => log::error!("{:?}", e),
                    }
                    // Self-rescheduling animation loop; stops when the event
                    // loop exits and the window drops.
                    window_handle.request_redraw();
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button: MouseButton::Left,
                    ..
                } => {
                    let cursor = if button_state.is_pressed() {
                        let position = state.scene.pointer;
                        state.pointer_down_at(position)
                    } else {
                        state.pointer_up()
                    };
                    cursor_change = Some(cursor);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let position = Vec2::new(position.x as f32, position.y as f32);
                    cursor_change = Some(state.pointer_moved(position));
                }
                WindowEvent::Touch(touch) => {
                    let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                    let cursor = match touch.phase {
                        TouchPhase::Started => state.pointer_down_at(position),
                        TouchPhase::Moved => state.pointer_moved(position),
                        TouchPhase::Ended | TouchPhase::Cancelled => state.pointer_up(),
                    };
                    cursor_change = Some(cursor);
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(KeyCode::KeyR),
                            state: key_state,
                            repeat,
                            ..
                        },
                    ..
                } => {
                    if key_state.is_pressed() && !repeat {
                        log::info!("FPS: {}", state.clock.fps());
                    }
                }
                _ => {}
            }
        }

        if let Some(cursor) = cursor_change {
            self.apply_cursor(cursor);
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).unwrap_throw();
            log::info!("Starting Plexview.");
            let (sender, receiver) = flume::unbounded();
            WASM_READY_FLUME_CHANNEL.set((sender, receiver))
                .expect("Failed to initialize WASM_READY_CHANNEL. This should not happen.");
            log::info!("WASM ready channel created and stored.");
        } else {
            env_logger::init();
        }
    }

    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        #[cfg(target_arch = "wasm32")]
        &event_loop,
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    log::info!("WASM started: Calling run().");
    run().unwrap_throw();

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmApi {
    proxy: EventLoopProxy<UserCommand>,
}

#[cfg(target_arch = "wasm32")]
impl WasmApi {
    fn send(&self, command: UserCommand) -> Result<(), JsValue> {
        if self.proxy.send_event(command).is_err() {
            return Err(JsValue::from_str("Failed to send command to event loop."));
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmApi {
    /// Force the 6-network constrained layout on or off, overriding the
    /// viewport-width heuristic.
    #[wasm_bindgen(js_name = setConstrainedDisplay)]
    pub fn set_constrained_display(&self, constrained: bool) -> Result<(), JsValue> {
        log::info!("Received SetConstrainedDisplay({}) from JS.", constrained);
        self.send(UserCommand::SetConstrainedDisplay(constrained))
    }

    /// Replace generation parameters from a JSON payload; missing fields
    /// keep their defaults.
    #[wasm_bindgen(js_name = setFieldParams)]
    pub fn set_field_params(&self, params_json: &str) -> Result<(), JsValue> {
        let params: FieldParams = serde_json::from_str(params_json)
            .map_err(|e| JsValue::from_str(&format!("JSON parsing error: {}", e)))?;

        log::info!("Received SetFieldParams command from JS.");
        self.send(UserCommand::SetFieldParams(params))
    }

    /// Scatter a fresh field with the current parameters.
    #[wasm_bindgen(js_name = rebuild)]
    pub fn rebuild(&self) -> Result<(), JsValue> {
        self.send(UserCommand::Rebuild)
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmApi)]
pub fn get_wasm_api() -> Result<WasmApi, JsValue> {
    WASM_API_INSTANCE
        .get()
        .cloned()
        .ok_or_else(|| JsValue::from_str("WasmApi is not initialized. Call run_web() first."))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmReadyPromise)]
pub fn get_wasm_ready_promise() -> Result<Promise, JsValue> {
    let (_, receiver) = WASM_READY_FLUME_CHANNEL.get().ok_or_else(|| {
        JsValue::from_str(
            "WASM ready channel already taken or not initialized. Make sure getWasmApi() is called only once.",
        )
    })?;

    // Convert the Rust Future obtained from the flume receiver into a js_sys::Promise
    let ready_promise = future_to_promise({
        let receiver = receiver.clone();
        async move {
            receiver.recv_async().await.unwrap_throw(); // Wait for the signal
            Ok(JsValue::NULL)
        }
    });

    Ok(ready_promise)
}
