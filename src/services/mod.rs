pub mod cancellation;
pub mod gemini_service;
pub mod generation_events;
pub mod itinerary_generation_service;
pub mod text_generation;
pub mod trip_service;
