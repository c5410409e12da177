//! Resource content classifier: maps a content-type tag to the rendering
//! surface configuration for it. The system's single entry point; an
//! unsupported tag becomes an error the caller turns into a fallback
//! display, never a panic.

use crate::error::{CoreError, CoreResult};
use crate::resource::{origin_of, ContentType, UiResource};
use crate::surface::SurfaceSpec;

pub fn classify(resource: &UiResource) -> CoreResult<SurfaceSpec> {
    match resource.content_type {
        // Markup may run its own scripts, but sees no host storage,
        // cookies, or window references, and cannot navigate.
        ContentType::Markup => Ok(SurfaceSpec {
            mode: ContentType::Markup,
            allow_scripts: true,
            storage_access: false,
            allowed_origin: None,
            block_navigation: true,
            block_popups: true,
        }),
        // External references get same-origin access to their own origin
        // only; top-level navigation and popups stay blocked.
        ContentType::ExternalReference => Ok(SurfaceSpec {
            mode: ContentType::ExternalReference,
            allow_scripts: true,
            storage_access: false,
            allowed_origin: origin_of(&resource.payload),
            block_navigation: true,
            block_popups: true,
        }),
        // Scripted programs run in the executor; the surface itself only
        // renders the projected native tree, never raw provider text.
        ContentType::ScriptedProgram => Ok(SurfaceSpec {
            mode: ContentType::ScriptedProgram,
            allow_scripts: false,
            storage_access: false,
            allowed_origin: None,
            block_navigation: true,
            block_popups: true,
        }),
        ContentType::Unknown => Err(CoreError::UnsupportedContentType {
            uri: resource.uri.clone(),
        }),
    }
}
