use std::{cell::RefCell, io, rc::Rc};

/// How a figure should be presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Display the figure to the user as it is drawn
    Human,
    /// Draw into the current figure without displaying it
    #[default]
    Legacy,
}

/// A read-only snapshot handed to a [`Renderer`] on every draw
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderRequest<'a> {
    /// Value function (or flattened Q values) to draw
    pub v: Option<&'a [f64]>,
    /// Position of the agent, if one should be drawn
    pub agent_state: Option<usize>,
    /// Action index per state
    pub policy: Option<&'a [usize]>,
    pub title: &'a str,
    pub mode: RenderMode,
}

/// Draws an environment, its value function and policy, and the agent within it
///
/// A renderer is a long-lived collaborator that may hold figure state between calls. It is implemented for
/// `&mut R`, `Box<R>` and `Rc<RefCell<R>>`, so an environment can borrow or share a plotter instead of owning it.
pub trait Renderer {
    /// Whatever the renderer hands back for a figure
    type Handle;

    /// Start a new figure
    fn new_render(&mut self, title: &str, mode: RenderMode) -> Self::Handle;

    /// Draw into the current figure
    fn render(&mut self, request: RenderRequest<'_>) -> Self::Handle;

    /// Write the current figure out under `title`
    fn save_fig(&mut self, title: &str) -> io::Result<()>;
}

/// A renderer that draws nothing, for headless training
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    type Handle = ();

    fn new_render(&mut self, _title: &str, _mode: RenderMode) {}

    fn render(&mut self, _request: RenderRequest<'_>) {}

    fn save_fig(&mut self, _title: &str) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    type Handle = R::Handle;

    fn new_render(&mut self, title: &str, mode: RenderMode) -> Self::Handle {
        (**self).new_render(title, mode)
    }

    fn render(&mut self, request: RenderRequest<'_>) -> Self::Handle {
        (**self).render(request)
    }

    fn save_fig(&mut self, title: &str) -> io::Result<()> {
        (**self).save_fig(title)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    type Handle = R::Handle;

    fn new_render(&mut self, title: &str, mode: RenderMode) -> Self::Handle {
        (**self).new_render(title, mode)
    }

    fn render(&mut self, request: RenderRequest<'_>) -> Self::Handle {
        (**self).render(request)
    }

    fn save_fig(&mut self, title: &str) -> io::Result<()> {
        (**self).save_fig(title)
    }
}

/// **Panics** if the renderer is already borrowed elsewhere during a call
impl<R: Renderer + ?Sized> Renderer for Rc<RefCell<R>> {
    type Handle = R::Handle;

    fn new_render(&mut self, title: &str, mode: RenderMode) -> Self::Handle {
        self.borrow_mut().new_render(title, mode)
    }

    fn render(&mut self, request: RenderRequest<'_>) -> Self::Handle {
        self.borrow_mut().render(request)
    }

    fn save_fig(&mut self, title: &str) -> io::Result<()> {
        self.borrow_mut().save_fig(title)
    }
}
